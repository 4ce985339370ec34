//! Bin post-processing: complex transform output to calibrated magnitude

use num_complex::Complex;

/// Per-bin user hook
///
/// Called with the bin index and the calibrated magnitude, which it may
/// rewrite in place. Any context the hook needs is captured by the closure.
pub type BinHook = Box<dyn Fn(usize, &mut f32) + Send + Sync>;

/// Calibrated single-sided magnitude of one bin
///
/// `sqrt(re² + im²) * 2 / window_sum`, in that order.
#[inline]
pub fn magnitude(value: Complex<f32>, window_sum: f32) -> f32 {
    let mut p = value.re * value.re + value.im * value.im;
    p = p.sqrt();
    p *= 2.0;
    p /= window_sum;
    p
}

/// Calibrated magnitude with the optional hook applied last
#[inline]
pub fn compute(bin_index: usize, value: Complex<f32>, window_sum: f32, hook: Option<&BinHook>) -> f32 {
    let mut p = magnitude(value, window_sum);
    if let Some(hook) = hook {
        hook(bin_index, &mut p);
    }
    p
}

/// Position of `(batch_index, bin_index)` in the flat output buffer
#[inline]
pub fn output_offset(batch_index: usize, bin_index: usize, bin_count: usize) -> usize {
    batch_index * (bin_count + 1) + bin_index
}

/// Convert a magnitude to dB relative to `reference`, clamped to avoid log(0)
pub fn magnitude_to_db(magnitude: f32, reference: f32) -> f32 {
    20.0 * (magnitude.max(1e-10) / reference).log10()
}
