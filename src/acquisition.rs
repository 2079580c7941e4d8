use std::sync::Arc;

use colored::Colorize;
use rayon::prelude::*;
use rustfft::Fft;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

use crate::code::CodeId;
use crate::code::CodeTable;
use crate::config::AcquisitionConfig;
use crate::correlation::Correlator;
use crate::detection::SearchProfiles;
use crate::detection::score_profiles;
use crate::doppler::DopplerGrid;
use crate::doppler::doppler_shift_spectrum;
use crate::error::AcquisitionError;
use crate::template::build_template;
use crate::types::DetectionResult;
use crate::types::IQSample;
use crate::util::norm_square;

/// Parallel code search over a Doppler x code-phase grid.
///
/// The sample window is transformed once; each code gets its own template
/// and an exhaustive sweep of the Doppler grid against that one spectrum.
pub struct Acquisition {
    cfg: AcquisitionConfig,
    grid: DopplerGrid,
    samples_per_code: usize,
    fft_fw: Arc<dyn Fft<f64>>,
    correlator: Correlator,
}

impl Acquisition {
    pub fn new(cfg: AcquisitionConfig) -> Result<Self, AcquisitionError> {
        cfg.validate()?;

        let mut fft_planner = FftPlanner::new();
        let samples_per_code = cfg.samples_per_code();
        let fft_fw = fft_planner.plan_fft_forward(cfg.fft_len());
        let correlator = Correlator::new(&mut fft_planner, samples_per_code, cfg.num_periods);
        let grid = DopplerGrid::from_config(&cfg);

        log::info!(
            "acquisition: fs={:.3}MHz samples_per_code={} periods={} chip_window={} doppler=+-{}Hz/{}Hz ({} bins) bin_width={:.1}Hz",
            cfg.sample_rate / 1e6,
            samples_per_code,
            cfg.num_periods,
            cfg.chip_window,
            cfg.doppler_offset_hz,
            cfg.doppler_step_hz,
            grid.len(),
            cfg.bin_width_hz(),
        );

        Ok(Self {
            cfg,
            grid,
            samples_per_code,
            fft_fw,
            correlator,
        })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.cfg
    }

    pub fn grid(&self) -> &DopplerGrid {
        &self.grid
    }

    /// Forward transform of the sample window, computed once per run.
    pub fn signal_spectrum(&self, sample: &IQSample) -> Result<Vec<Complex64>, AcquisitionError> {
        let expected = self.cfg.fft_len();
        if sample.iq_vec.len() != expected {
            return Err(AcquisitionError::BufferLength {
                expected,
                got: sample.iq_vec.len(),
            });
        }
        if (sample.sample_rate - self.cfg.sample_rate).abs() > 1e-6 * self.cfg.sample_rate {
            return Err(AcquisitionError::SampleRateMismatch {
                expected: self.cfg.sample_rate,
                got: sample.sample_rate,
            });
        }
        log::debug!(
            "signal: {} samples ts_sec={:.3} power={:.3e}",
            sample.iq_vec.len(),
            sample.ts_sec,
            norm_square(&sample.iq_vec) / sample.iq_vec.len() as f64
        );

        let mut spectrum = sample.iq_vec.clone();
        self.fft_fw.process(&mut spectrum);
        Ok(spectrum)
    }

    pub fn build_template(&self, prn: CodeId, code: &[f64]) -> Result<Vec<Complex64>, AcquisitionError> {
        build_template(
            self.fft_fw.as_ref(),
            prn,
            code,
            self.cfg.chip_window,
            self.cfg.num_periods,
        )
    }

    fn check_spectrum_len(&self, spectrum: &[Complex64]) -> Result<(), AcquisitionError> {
        let expected = self.cfg.fft_len();
        if spectrum.len() != expected {
            return Err(AcquisitionError::BufferLength {
                expected,
                got: spectrum.len(),
            });
        }
        Ok(())
    }

    /// Exhaustive sweep of every Doppler bin. Bins run in parallel, each
    /// worker folds into its own accumulator and the partial profiles are
    /// max-reduced.
    pub fn doppler_search(
        &self,
        signal_fft: &[Complex64],
        template_fft: &[Complex64],
    ) -> Result<SearchProfiles, AcquisitionError> {
        self.check_spectrum_len(signal_fft)?;
        self.check_spectrum_len(template_fft)?;
        let num_bins = self.grid.len();
        let spc = self.samples_per_code;

        let profiles = (0..num_bins)
            .into_par_iter()
            .fold(
                || SearchProfiles::new(spc, num_bins),
                |acc, bin| {
                    let doppler_hz = self.grid.freq_hz(bin);
                    let shifted = doppler_shift_spectrum(signal_fft, doppler_hz, self.cfg.sample_rate);
                    let profile = self.correlator.correlate(&shifted, template_fft);
                    acc.absorb(bin, &profile)
                },
            )
            .reduce(|| SearchProfiles::new(spc, num_bins), SearchProfiles::merge);
        Ok(profiles)
    }

    pub fn acquire_code(
        &self,
        signal_fft: &[Complex64],
        prn: CodeId,
        code: &[f64],
    ) -> Result<DetectionResult, AcquisitionError> {
        self.check_spectrum_len(signal_fft)?;
        if code.len() != self.samples_per_code {
            return Err(AcquisitionError::CodeLength {
                prn,
                expected: self.samples_per_code,
                got: code.len(),
            });
        }
        let template_fft = self.build_template(prn, code)?;
        let profiles = self.doppler_search(signal_fft, &template_fft)?;

        Ok(score_profiles(
            prn,
            &profiles,
            &self.grid,
            self.cfg.code_period_sec,
            self.cfg.threshold,
        ))
    }

    /// Lazily search `codes` one identifier at a time. A failing identifier
    /// yields an `Err` item and the stream moves on to the next one.
    pub fn search_codes<'a, I>(
        &'a self,
        signal_fft: &'a [Complex64],
        codes: I,
    ) -> impl Iterator<Item = Result<DetectionResult, AcquisitionError>> + 'a
    where
        I: IntoIterator<Item = (CodeId, &'a [f64])>,
        I::IntoIter: 'a,
    {
        codes.into_iter().map(move |(prn, code)| {
            let res = self.acquire_code(signal_fft, prn, code);
            if let Err(e) = &res {
                log::warn!("prn {}: {}", prn, format!("{}", e).red());
            }
            res
        })
    }

    /// Result stream over every code in `table`, in identifier order.
    pub fn search<'a>(
        &'a self,
        signal_fft: &'a [Complex64],
        table: &'a CodeTable,
    ) -> impl Iterator<Item = Result<DetectionResult, AcquisitionError>> + 'a {
        self.search_codes(signal_fft, table.iter())
    }

    /// Search all codes of `table` in parallel and collect the results in
    /// identifier order.
    pub fn search_all(
        &self,
        sample: &IQSample,
        table: &CodeTable,
    ) -> Result<Vec<Result<DetectionResult, AcquisitionError>>, AcquisitionError> {
        let signal_fft = self.signal_spectrum(sample)?;
        let codes: Vec<_> = table.iter().collect();

        Ok(codes
            .par_iter()
            .map(|&(prn, code)| {
                let res = self.acquire_code(&signal_fft, prn, code);
                if let Err(e) = &res {
                    log::warn!("prn {}: {}", prn, format!("{}", e).red());
                }
                res
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    fn small_config() -> AcquisitionConfig {
        AcquisitionConfig {
            sample_rate: 2.046e6,
            num_periods: 2,
            chip_window: 1,
            doppler_offset_hz: 5000.0,
            doppler_step_hz: 500.0,
            ..Default::default()
        }
    }

    fn tiled(code: &[f64], delay: usize, periods: usize, doppler_hz: f64, fs: f64) -> IQSample {
        let n = code.len();
        let iq_vec = (0..n * periods)
            .map(|i| {
                let phase = 2.0 * PI * doppler_hz * i as f64 / fs;
                Complex64::from_polar(code[(i + n - delay) % n], phase)
            })
            .collect();
        IQSample::new(iq_vec, fs)
    }

    #[test]
    fn test_sweep_completeness() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec).unwrap();
        let code = table.get(5).unwrap();

        let spectrum = acq.signal_spectrum(&tiled(code, 0, 2, 0.0, cfg.sample_rate)).unwrap();
        let template = acq.build_template(5, code).unwrap();
        let profiles = acq.doppler_search(&spectrum, &template).unwrap();

        assert_eq!(profiles.doppler.len(), 21);
        assert_eq!(profiles.phase.len(), 2046);
        assert_eq!(acq.grid().freq_hz(0), -5000.0);
        assert_eq!(acq.grid().freq_hz(20), 5000.0);
        assert!(profiles.doppler.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_doppler_and_phase_recovery() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec).unwrap();
        let code = table.get(12).unwrap();

        // 3 bins of 500Hz
        let sample = tiled(code, 700, 2, 1500.0, cfg.sample_rate);
        let spectrum = acq.signal_spectrum(&sample).unwrap();
        let res = acq.acquire_code(&spectrum, 12, code).unwrap();

        assert!(res.detected);
        assert_eq!(res.code_phase_idx, 700);
        assert!((res.doppler_hz - 1500.0).abs() <= cfg.bin_width_hz());
    }

    #[test]
    fn test_buffer_length() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let sample = IQSample::new(vec![Complex64::default(); 4091], cfg.sample_rate);
        let err = acq.signal_spectrum(&sample).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::BufferLength {
                expected: 4092,
                got: 4091
            }
        ));
        assert!(err.is_configuration());

        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec).unwrap();
        assert!(acq.search_all(&sample, &table).is_err());
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let acq = Acquisition::new(small_config()).unwrap();
        let sample = IQSample::new(vec![Complex64::default(); 4092], 4e6);
        assert!(matches!(
            acq.signal_spectrum(&sample),
            Err(AcquisitionError::SampleRateMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let cfg = AcquisitionConfig {
            chip_window: 0,
            ..small_config()
        };
        assert!(matches!(
            Acquisition::new(cfg),
            Err(AcquisitionError::ChipWindow { .. })
        ));
    }

    #[test]
    fn test_empty_table() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let sample = IQSample::new(vec![Complex64::new(1.0, 0.0); 4092], cfg.sample_rate);
        let spectrum = acq.signal_spectrum(&sample).unwrap();
        let table = CodeTable::new(2046);
        assert_eq!(acq.search(&spectrum, &table).count(), 0);
        assert!(acq.search_all(&sample, &table).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_spectrum_length() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec)
            .unwrap()
            .select(&[1, 2])
            .unwrap();
        let spectrum = vec![Complex64::new(1.0, 0.0); 100];

        let results: Vec<_> = acq.search(&spectrum, &table).collect();
        assert_eq!(results.len(), 2);
        for res in &results {
            assert!(matches!(
                res,
                Err(AcquisitionError::BufferLength {
                    expected: 4092,
                    got: 100
                })
            ));
        }

        let template = acq.build_template(1, table.get(1).unwrap()).unwrap();
        assert!(matches!(
            acq.doppler_search(&spectrum, &template),
            Err(AcquisitionError::BufferLength { .. })
        ));
        let good = vec![Complex64::new(1.0, 0.0); 4092];
        assert!(acq.doppler_search(&good, &template[..100]).is_err());
    }

    #[test]
    fn test_per_code_failure_is_isolated() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec).unwrap();
        let good = table.get(2).unwrap();
        let short = vec![1.0; 1000];

        let sample = tiled(good, 0, 2, 0.0, cfg.sample_rate);
        let spectrum = acq.signal_spectrum(&sample).unwrap();
        let codes: Vec<(CodeId, &[f64])> = vec![(1, table.get(1).unwrap()), (9, short.as_slice()), (2, good)];
        let results: Vec<_> = acq.search_codes(&spectrum, codes).collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(AcquisitionError::CodeLength { prn: 9, .. })
        ));
        let res = results[2].as_ref().unwrap();
        assert_eq!(res.prn, 2);
        assert!(res.detected);
    }

    #[test]
    fn test_all_zero_input() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec)
            .unwrap()
            .select(&[1, 2])
            .unwrap();
        let sample = IQSample::new(vec![Complex64::default(); 4092], cfg.sample_rate);

        for res in acq.search_all(&sample, &table).unwrap() {
            let res = res.unwrap();
            assert!(!res.detected);
            assert_eq!(res.score, 0.0);
        }
    }

    #[test]
    fn test_search_all_matches_stream() {
        let cfg = small_config();
        let acq = Acquisition::new(cfg.clone()).unwrap();
        let table = CodeTable::l1ca(cfg.sample_rate, cfg.code_period_sec)
            .unwrap()
            .select(&[4, 8, 15])
            .unwrap();
        let sample = tiled(table.get(8).unwrap(), 33, 2, -2000.0, cfg.sample_rate);
        let spectrum = acq.signal_spectrum(&sample).unwrap();

        let streamed: Vec<_> = acq.search(&spectrum, &table).map(|r| r.unwrap()).collect();
        let parallel: Vec<_> = acq
            .search_all(&sample, &table)
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(streamed.len(), 3);
        for (a, b) in streamed.iter().zip(&parallel) {
            assert_eq!(a.prn, b.prn);
            assert_eq!(a.detected, b.detected);
            assert_eq!(a.code_phase_idx, b.code_phase_idx);
            assert_eq!(a.doppler_hz, b.doppler_hz);
        }
        let hit = streamed.iter().find(|r| r.prn == 8).unwrap();
        assert!(hit.detected);
        assert_eq!(hit.code_phase_idx, 33);
        assert_eq!(hit.doppler_hz, -2000.0);
    }
}
