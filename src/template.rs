use rustfft::Fft;
use rustfft::Length;
use rustfft::num_complex::Complex64;

use crate::code::CodeId;
use crate::error::AcquisitionError;

/// Frequency-domain correlation template for one code: the code tiled
/// `chip_window` times, zero padded to `num_periods` periods, transformed
/// and conjugated.
pub fn build_template(
    fft_fw: &dyn Fft<f64>,
    prn: CodeId,
    code: &[f64],
    chip_window: usize,
    num_periods: usize,
) -> Result<Vec<Complex64>, AcquisitionError> {
    if code.is_empty() {
        return Err(AcquisitionError::InvalidCode {
            prn,
            reason: "empty sequence".to_string(),
        });
    }
    if chip_window == 0 || chip_window > num_periods {
        return Err(AcquisitionError::ChipWindow {
            chip_window,
            num_periods,
        });
    }
    let fft_len = code.len() * num_periods;
    if fft_fw.len() != fft_len {
        return Err(AcquisitionError::CodeLength {
            prn,
            expected: fft_fw.len() / num_periods,
            got: code.len(),
        });
    }

    let mut template: Vec<Complex64> = code
        .iter()
        .cycle()
        .take(code.len() * chip_window)
        .map(|&x| Complex64::new(x, 0.0))
        .chain(std::iter::repeat_n(
            Complex64::default(),
            code.len() * (num_periods - chip_window),
        ))
        .collect();
    debug_assert_eq!(template.len(), fft_len);

    fft_fw.process(&mut template);
    template.iter_mut().for_each(|c| *c = c.conj());

    Ok(template)
}
