//! Sample normalization and windowing
//!
//! Converts signed 16-bit frames into windowed `f32` transform input.

/// Full-scale divisor for signed 16-bit samples (i16::MAX + 1)
pub const SAMPLE_FULL_SCALE: f32 = 32768.0;

/// Normalize one sample to [-1, 1) and apply its window multiplier
#[inline]
pub fn prepare_sample(sample: i16, multiplier: f32) -> f32 {
    (sample as f32 / SAMPLE_FULL_SCALE) * multiplier
}

/// Window a frame into the head of a padded slot
///
/// Only the first `window.len()` entries of `slot` are written; any padding
/// after them keeps whatever it held (zeros, for engine staging slots).
///
/// # Arguments
/// * `frame` - Raw samples, exactly `window.len()` long
/// * `window` - Window multipliers
/// * `slot` - Destination, at least `window.len()` long
#[inline]
pub fn prepare_frame(frame: &[i16], window: &[f32], slot: &mut [f32]) {
    debug_assert_eq!(frame.len(), window.len());
    debug_assert!(slot.len() >= window.len());

    for ((dst, &sample), &w) in slot.iter_mut().zip(frame.iter()).zip(window.iter()) {
        *dst = prepare_sample(sample, w);
    }
}
