use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_NUM_PERIODS;
use crate::constants::DEFAULT_SAMPLE_RATE;
use crate::constants::DOPPLER_SPREAD_HZ;
use crate::constants::DOPPLER_STEP_HZ;
use crate::constants::L1CA_CODE_SEC;
use crate::constants::L1CA_HZ;
use crate::constants::MAX_COHERENT_PERIODS;
use crate::constants::SNR_THRESHOLD;
use crate::error::AcquisitionError;

/// Scalar parameters of one acquisition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub sample_rate: f64,
    /// informational only, the search runs at baseband
    pub center_freq: f64,
    pub code_period_sec: f64,
    /// number of code periods in the sample window
    pub num_periods: usize,
    /// number of code periods tiled into the template
    pub chip_window: usize,
    pub doppler_offset_hz: f64,
    pub doppler_step_hz: f64,
    pub threshold: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            center_freq: L1CA_HZ,
            code_period_sec: L1CA_CODE_SEC,
            num_periods: DEFAULT_NUM_PERIODS,
            chip_window: default_chip_window(DEFAULT_NUM_PERIODS),
            doppler_offset_hz: DOPPLER_SPREAD_HZ,
            doppler_step_hz: DOPPLER_STEP_HZ,
            threshold: SNR_THRESHOLD,
        }
    }
}

/// Half the window, capped, and never below one period.
pub fn default_chip_window(num_periods: usize) -> usize {
    usize::min(MAX_COHERENT_PERIODS, num_periods / 2).max(1)
}

impl AcquisitionConfig {
    /// Samples in one code period. Only meaningful on a validated config.
    pub fn samples_per_code(&self) -> usize {
        (self.sample_rate * self.code_period_sec).round() as usize
    }

    pub fn fft_len(&self) -> usize {
        self.samples_per_code() * self.num_periods
    }

    /// Spacing of the FFT bins over the whole window.
    pub fn bin_width_hz(&self) -> f64 {
        self.sample_rate / self.fft_len() as f64
    }

    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(AcquisitionError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(self.code_period_sec.is_finite() && self.code_period_sec > 0.0) {
            return Err(AcquisitionError::InvalidConfig(format!(
                "code period must be positive, got {}",
                self.code_period_sec
            )));
        }
        let samples = self.sample_rate * self.code_period_sec;
        if samples < 1.0 || (samples - samples.round()).abs() > 1e-6 {
            return Err(AcquisitionError::InvalidConfig(format!(
                "sample rate {} Hz does not give a whole number of samples per code period ({})",
                self.sample_rate, samples
            )));
        }
        if self.num_periods == 0 {
            return Err(AcquisitionError::InvalidConfig(
                "window must contain at least one code period".to_string(),
            ));
        }
        if self.chip_window == 0 || self.chip_window > self.num_periods {
            return Err(AcquisitionError::ChipWindow {
                chip_window: self.chip_window,
                num_periods: self.num_periods,
            });
        }
        if !(self.doppler_step_hz.is_finite() && self.doppler_step_hz > 0.0) {
            return Err(AcquisitionError::InvalidConfig(format!(
                "doppler step must be positive, got {}",
                self.doppler_step_hz
            )));
        }
        if !(self.doppler_offset_hz.is_finite() && self.doppler_offset_hz >= 0.0) {
            return Err(AcquisitionError::InvalidConfig(format!(
                "doppler offset must be non-negative, got {}",
                self.doppler_offset_hz
            )));
        }
        if !self.threshold.is_finite() {
            return Err(AcquisitionError::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}
