use rustfft::num_complex::Complex64;

pub fn norm_square(v: &[Complex64]) -> f64 {
    v.iter().map(|&x| x.norm_sqr()).sum::<f64>()
}

/// Index and value of the largest element. First index wins on ties,
/// an empty slice gives `(0, 0.0)`.
pub fn get_max_with_idx(v: &[f64]) -> (usize, f64) {
    let mut max = f64::NEG_INFINITY;
    let mut idx = 0;
    for (i, &x) in v.iter().enumerate() {
        if x > max {
            max = x;
            idx = i;
        }
    }
    if v.is_empty() { (0, 0.0) } else { (idx, max) }
}

pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Coherent sum of consecutive `period`-long blocks.
pub fn fold_periods(v: &[Complex64], period: usize) -> Vec<Complex64> {
    assert!(period > 0 && v.len() % period == 0);

    let mut folded = vec![Complex64::default(); period];
    for block in v.chunks_exact(period) {
        for (acc, &x) in folded.iter_mut().zip(block) {
            *acc += x;
        }
    }
    folded
}
