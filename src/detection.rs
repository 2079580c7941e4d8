use colored::Colorize;

use crate::code::CodeId;
use crate::doppler::DopplerGrid;
use crate::types::DetectionResult;
use crate::util::get_max_with_idx;
use crate::util::mean;

/// Running aggregates of one code's Doppler sweep.
///
/// `phase[i]` is the largest squared correlation seen at code phase `i`
/// over all Doppler bins absorbed so far. `doppler[k]` is the peak of the
/// phase profile computed at Doppler bin `k`; bins not yet searched read 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProfiles {
    pub phase: Vec<f64>,
    pub doppler: Vec<f64>,
}

impl SearchProfiles {
    pub fn new(samples_per_code: usize, num_bins: usize) -> Self {
        Self {
            phase: vec![0.0; samples_per_code],
            doppler: vec![0.0; num_bins],
        }
    }

    pub fn absorb(mut self, bin: usize, profile: &[f64]) -> Self {
        assert_eq!(profile.len(), self.phase.len());
        let (_, peak) = get_max_with_idx(profile);
        self.doppler[bin] = f64::max(self.doppler[bin], peak);
        for (acc, &p) in self.phase.iter_mut().zip(profile) {
            *acc = f64::max(*acc, p);
        }
        self
    }

    pub fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.phase.iter_mut().zip(other.phase) {
            *a = f64::max(*a, b);
        }
        for (a, b) in self.doppler.iter_mut().zip(other.doppler) {
            *a = f64::max(*a, b);
        }
        self
    }
}

/// Peak-to-mean ratio and peak index; 0 when the profile has no usable
/// noise floor.
fn peak_to_mean(v: &[f64]) -> (usize, f64) {
    let (idx, max) = get_max_with_idx(v);
    let avg = mean(v);
    if !max.is_finite() || !avg.is_finite() || avg <= 0.0 {
        return (idx, 0.0);
    }
    (idx, max / avg)
}

pub fn score_profiles(
    prn: CodeId,
    profiles: &SearchProfiles,
    grid: &DopplerGrid,
    code_period_sec: f64,
    threshold: f64,
) -> DetectionResult {
    let (doppler_idx, snr_doppler) = peak_to_mean(&profiles.doppler);
    let (phase_idx, snr_phase) = peak_to_mean(&profiles.phase);
    let score = snr_doppler * snr_phase;
    let samples_per_code = profiles.phase.len().max(1);

    let res = DetectionResult {
        prn,
        detected: score > threshold,
        code_phase_idx: phase_idx,
        code_phase_sec: phase_idx as f64 / samples_per_code as f64 * code_period_sec,
        doppler_hz: grid.freq_hz(doppler_idx),
        snr_doppler,
        snr_phase,
        score,
    };

    log::debug!(
        "prn {}: snr_doppler={:.2} snr_phase={:.2} score={:.2} phase_idx={} dopp={:.0}",
        prn,
        res.snr_doppler,
        res.snr_phase,
        res.score,
        res.code_phase_idx,
        res.doppler_hz
    );
    if res.detected {
        log::info!(
            " prn: {} -- doppler_hz: {:6.0} code_phase: {:7.2} usec score: {}",
            format!("{:2}", prn).yellow(),
            res.doppler_hz,
            res.code_phase_usec(),
            format!("{:.2}", res.score).green(),
        );
    }
    res
}
