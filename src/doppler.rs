use rustfft::num_complex::Complex64;

use crate::config::AcquisitionConfig;

/// Symmetric Doppler search range, `-offset_hz..=offset_hz` in `step_hz`
/// increments, lowest frequency first.
#[derive(Debug, Clone, Copy)]
pub struct DopplerGrid {
    offset_hz: f64,
    step_hz: f64,
    num_bins: usize,
}

impl DopplerGrid {
    pub fn new(offset_hz: f64, step_hz: f64) -> Self {
        assert!(step_hz > 0.0 && offset_hz >= 0.0);
        let num_bins = (2.0 * offset_hz / step_hz + 1e-9).floor() as usize + 1;
        Self {
            offset_hz,
            step_hz,
            num_bins,
        }
    }

    pub fn from_config(cfg: &AcquisitionConfig) -> Self {
        Self::new(cfg.doppler_offset_hz, cfg.doppler_step_hz)
    }

    pub fn len(&self) -> usize {
        self.num_bins
    }

    pub fn is_empty(&self) -> bool {
        self.num_bins == 0
    }

    pub fn freq_hz(&self, idx: usize) -> f64 {
        -self.offset_hz + idx as f64 * self.step_hz
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_bins).map(|idx| self.freq_hz(idx))
    }
}

/// Number of FFT bins closest to `doppler_hz` for an `fft_len`-point
/// transform at `sample_rate`.
pub fn doppler_to_bins(doppler_hz: f64, sample_rate: f64, fft_len: usize) -> isize {
    (doppler_hz / sample_rate * fft_len as f64).round() as isize
}

/// Wipe a carrier offset of `doppler_hz` off a signal spectrum by circular
/// bin rotation: energy at `+doppler_hz` lands on DC. Resolution is one bin,
/// finer offsets alias to the nearest bin.
///
/// The hypothesis that wins is therefore the carrier offset actually present
/// in the signal, with its sign. Rotating the spectrum the other way (bins
/// moved up by `doppler_hz`) reports the negated offset. The bin count is
/// rounded, not truncated toward zero, so `+d` and `-d` give mirrored shifts.
pub fn doppler_shift_spectrum(
    spectrum: &[Complex64],
    doppler_hz: f64,
    sample_rate: f64,
) -> Vec<Complex64> {
    let n = spectrum.len();
    let mut shifted = spectrum.to_vec();
    if n == 0 {
        return shifted;
    }
    let bins = doppler_to_bins(doppler_hz, sample_rate, n);
    shifted.rotate_left(bins.rem_euclid(n as isize) as usize);
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_grid_len_and_order() {
        let grid = DopplerGrid::new(30000.0, 250.0);
        assert_eq!(grid.len(), 241);
        assert_eq!(grid.freq_hz(0), -30000.0);
        assert_eq!(grid.freq_hz(120), 0.0);
        assert_eq!(grid.freq_hz(240), 30000.0);

        let freqs: Vec<_> = grid.iter().collect();
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));

        // range not a multiple of the step: last bin stays inside the range
        let grid = DopplerGrid::new(1000.0, 300.0);
        assert_eq!(grid.len(), 7);
        assert_eq!(grid.freq_hz(6), 800.0);

        assert_eq!(DopplerGrid::new(0.0, 100.0).len(), 1);
    }

    #[test]
    fn test_doppler_to_bins() {
        assert_eq!(doppler_to_bins(0.0, 4e6, 8000), 0);
        assert_eq!(doppler_to_bins(1000.0, 4e6, 8000), 2);
        assert_eq!(doppler_to_bins(-1000.0, 4e6, 8000), -2);
        // half a bin rounds away from zero, symmetrically
        assert_eq!(doppler_to_bins(250.0, 4e6, 8000), 1);
        assert_eq!(doppler_to_bins(-250.0, 4e6, 8000), -1);
        assert_eq!(doppler_to_bins(100.0, 4e6, 8000), 0);
    }

    #[test]
    fn test_shift_is_circular() {
        let v: Vec<_> = (0..8).map(|i| Complex64::new(i as f64, 0.0)).collect();
        // 8 bins over 8 Hz: one bin per Hz
        let s = doppler_shift_spectrum(&v, 3.0, 8.0);
        assert_eq!(s[0].re, 3.0);
        assert_eq!(s[5].re, 0.0);
        let s = doppler_shift_spectrum(&v, -3.0, 8.0);
        assert_eq!(s[0].re, 5.0);
        assert_eq!(s[3].re, 0.0);
        assert_eq!(doppler_shift_spectrum(&v, 0.0, 8.0), v);
    }

    #[test]
    fn test_shift_wipes_tone() {
        let n = 64;
        let fs = 64.0;
        let k = 5;
        let mut tone: Vec<_> = (0..n)
            .map(|i| Complex64::from_polar(1.0, 2.0 * PI * (k * i) as f64 / n as f64))
            .collect();
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut tone);

        let s = doppler_shift_spectrum(&tone, k as f64, fs);
        assert!((s[0].norm() - n as f64).abs() < 1e-9);
        assert!(s[1..].iter().all(|c| c.norm() < 1e-9));
    }

    #[test]
    fn test_shift_sign_follows_carrier() {
        let n = 64;
        let fs = 64.0;
        let k = 5;
        let mut tone: Vec<_> = (0..n)
            .map(|i| Complex64::from_polar(1.0, -2.0 * PI * (k * i) as f64 / n as f64))
            .collect();
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut tone);

        // carrier below center: only the negative hypothesis wipes it off
        let s = doppler_shift_spectrum(&tone, -(k as f64), fs);
        assert!((s[0].norm() - n as f64).abs() < 1e-9);
        let s = doppler_shift_spectrum(&tone, k as f64, fs);
        assert!(s[0].norm() < 1e-9);

        // 1.6 bins rounds to 2, truncation would give 1
        assert_eq!(doppler_to_bins(1.6, fs, n), 2);
        assert_eq!(doppler_to_bins(-1.6, fs, n), -2);
    }
}
