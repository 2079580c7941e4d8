use std::sync::Arc;

use rustfft::Fft;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

use crate::util::fold_periods;

/// Circular correlation of a signal spectrum against a template spectrum,
/// folded coherently over the code periods of the window.
pub struct Correlator {
    samples_per_code: usize,
    num_periods: usize,
    fft_bw: Arc<dyn Fft<f64>>,
}

impl Correlator {
    pub fn new(fft_planner: &mut FftPlanner<f64>, samples_per_code: usize, num_periods: usize) -> Self {
        Self {
            samples_per_code,
            num_periods,
            fft_bw: fft_planner.plan_fft_inverse(samples_per_code * num_periods),
        }
    }

    pub fn fft_len(&self) -> usize {
        self.samples_per_code * self.num_periods
    }

    /// Squared correlation magnitude per code phase, `samples_per_code` long.
    pub fn correlate(&self, signal_fft: &[Complex64], template_fft: &[Complex64]) -> Vec<f64> {
        let n = self.fft_len();
        assert_eq!(signal_fft.len(), n);
        assert_eq!(template_fft.len(), n);

        let mut corr: Vec<Complex64> = signal_fft
            .iter()
            .zip(template_fft)
            .map(|(&s, &t)| s * t)
            .collect();

        self.fft_bw.process(&mut corr);
        let scale = 1.0 / n as f64;

        fold_periods(&corr, self.samples_per_code)
            .iter()
            .map(|c| (c * scale).norm_sqr())
            .collect()
    }
}
