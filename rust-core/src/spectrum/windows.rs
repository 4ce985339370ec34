//! Window functions for batched spectral analysis
//!
//! Every shape is a closed-form function of the sample index `i` and the
//! frame size `N`. Values and their running sum are computed in `f32` so the
//! sum matches what a caller gets by adding the values up directly.

use std::f32::consts::PI;

use crate::batch::buffer::try_filled_vec;
use crate::error::{Result, SpectrumError};

const HAMMING_A0: f32 = 0.53836;
const HAMMING_A1: f32 = 0.46164;

const BLACKMAN: [f32; 3] = [0.42659, 0.49656, 0.076849];
const NUTTALL: [f32; 4] = [0.355768, 0.487396, 0.144232, 0.012604];
const BLACKMAN_NUTTALL: [f32; 4] = [0.3635819, 0.4891775, 0.1365995, 0.0106411];
const BLACKMAN_HARRIS: [f32; 4] = [0.35875, 0.48829, 0.14128, 0.01168];
const FLAT_TOP: [f32; 5] = [1.0, 1.930, 1.290, 0.388, 0.028];

/// Window function selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    /// w[i] = 1 (equivalent to no windowing)
    #[default]
    Rectangle,

    /// w[i] = 1 - |i - (N-1)/2| / (N/2)
    Triangular,

    /// w[i] = 1 - |i - (N-1)/2| / ((N-1)/2)
    Bartlett,

    /// w[i] = sin(iπ/(N-1))
    Sine,

    /// w[i] = sin²(iπ/(N-1))
    Hann,

    /// w[i] = 0.53836 - 0.46164*cos(2πi/(N-1))
    Hamming,

    /// w[i] = 1 - ((i - (N-1)/2) / ((N-1)/2))²
    Welch,

    /// Three-term cosine sum, ~-58 dB sidelobes
    Blackman,

    /// Four-term cosine sum with continuous first derivative
    Nuttall,

    /// Four-term cosine sum, ~-98 dB sidelobes
    BlackmanNuttall,

    /// Four-term cosine sum, ~-92 dB sidelobes
    BlackmanHarris,

    /// Five-term cosine sum with a flat passband, for amplitude accuracy
    FlatTop,
}

impl WindowFunction {
    /// All supported shapes, in declaration order
    pub const ALL: [WindowFunction; 12] = [
        WindowFunction::Rectangle,
        WindowFunction::Triangular,
        WindowFunction::Bartlett,
        WindowFunction::Sine,
        WindowFunction::Hann,
        WindowFunction::Hamming,
        WindowFunction::Welch,
        WindowFunction::Blackman,
        WindowFunction::Nuttall,
        WindowFunction::BlackmanNuttall,
        WindowFunction::BlackmanHarris,
        WindowFunction::FlatTop,
    ];

    /// Smallest frame size for which the formula is defined
    ///
    /// Every shape except the rectangle divides by `N - 1`.
    pub fn min_frame_size(&self) -> usize {
        match self {
            WindowFunction::Rectangle => 1,
            _ => 2,
        }
    }

    /// Fill `values` with the window and return the sum of the values
    ///
    /// The frame size is `values.len()`. Frame sizes below
    /// [`min_frame_size`](Self::min_frame_size) produce non-finite values;
    /// `WindowTable::build` rejects them before calling this.
    pub fn fill(&self, values: &mut [f32]) -> f32 {
        let n = values.len();
        let n_minus_1 = n as f32 - 1.0;
        let half_span = n_minus_1 / 2.0;
        let mut sum = 0.0f32;

        for (i, v) in values.iter_mut().enumerate() {
            let x = i as f32;
            *v = match self {
                WindowFunction::Rectangle => 1.0,
                WindowFunction::Triangular => 1.0 - ((x - half_span) / (n as f32 / 2.0)).abs(),
                WindowFunction::Bartlett => 1.0 - ((x - half_span) / half_span).abs(),
                WindowFunction::Sine => (x * PI / n_minus_1).sin(),
                WindowFunction::Hann => {
                    let s = (x * PI / n_minus_1).sin();
                    s * s
                }
                WindowFunction::Hamming => {
                    HAMMING_A0 - HAMMING_A1 * (x * 2.0 * PI / n_minus_1).cos()
                }
                WindowFunction::Welch => {
                    let r = (x - half_span) / half_span;
                    1.0 - r * r
                }
                WindowFunction::Blackman => cosine_sum(&BLACKMAN, x, n_minus_1),
                WindowFunction::Nuttall => cosine_sum(&NUTTALL, x, n_minus_1),
                WindowFunction::BlackmanNuttall => cosine_sum(&BLACKMAN_NUTTALL, x, n_minus_1),
                WindowFunction::BlackmanHarris => cosine_sum(&BLACKMAN_HARRIS, x, n_minus_1),
                WindowFunction::FlatTop => cosine_sum(&FLAT_TOP, x, n_minus_1),
            };
            sum += *v;
        }

        sum
    }
}

/// a0 - a1*cos(2πi/(N-1)) + a2*cos(4πi/(N-1)) - ...
#[inline]
fn cosine_sum(coeffs: &[f32], x: f32, n_minus_1: f32) -> f32 {
    let mut acc = coeffs[0];
    for (k, &a) in coeffs.iter().enumerate().skip(1) {
        let term = a * (x * 2.0 * k as f32 * PI / n_minus_1).cos();
        if k % 2 == 1 {
            acc -= term;
        } else {
            acc += term;
        }
    }
    acc
}

/// Sums at or below this are rounding noise around zero
///
/// Shapes with zero end points have an exact sum of 0 at two samples, and
/// `f32` evaluation leaves a residue of either sign.
#[inline]
fn min_usable_sum(frame_size: usize) -> f32 {
    frame_size as f32 * f32::EPSILON
}

/// User replacement for the built-in window builder
///
/// Receives the zeroed multiplier slice (`frame_size` long), fills it and
/// returns the sum of the multipliers.
pub type WindowBuilder = Box<dyn Fn(&mut [f32]) -> f32 + Send + Sync>;

/// Where the window table comes from
#[derive(Clone, Copy)]
pub enum WindowSource<'a> {
    Builtin(WindowFunction),
    Custom(&'a WindowBuilder),
}

/// Precomputed per-sample multipliers and their sum
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    values: Box<[f32]>,
    sum: f32,
}

impl WindowTable {
    /// Build the table for `frame_size` samples
    ///
    /// Fails with `InvalidArgument` when the frame is too short for the
    /// chosen shape or the resulting sum cannot be used as a divisor.
    pub fn build(source: WindowSource<'_>, frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(SpectrumError::InvalidArgument(
                "frame size must be greater than 0".into(),
            ));
        }

        if let WindowSource::Builtin(function) = source {
            if frame_size < function.min_frame_size() {
                return Err(SpectrumError::InvalidArgument(format!(
                    "{:?} window needs a frame size of at least {} (got {})",
                    function,
                    function.min_frame_size(),
                    frame_size
                )));
            }
        }

        let mut values = try_filled_vec("window table", frame_size, 0.0f32)?;
        let sum = match source {
            WindowSource::Builtin(function) => function.fill(&mut values),
            WindowSource::Custom(builder) => builder(&mut values),
        };

        if !sum.is_finite() || sum <= min_usable_sum(frame_size) {
            return Err(SpectrumError::InvalidArgument(format!(
                "window sum {} is not a usable divisor for a frame of {} samples",
                sum, frame_size
            )));
        }

        Ok(Self {
            values: values.into_boxed_slice(),
            sum,
        })
    }

    /// Convenience for a built-in shape
    pub fn for_function(function: WindowFunction, frame_size: usize) -> Result<Self> {
        Self::build(WindowSource::Builtin(function), frame_size)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sum of the multipliers, the magnitude normalization divisor
    pub fn sum(&self) -> f32 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_matches_values_for_all_windows() {
        for function in WindowFunction::ALL {
            for &n in &[7usize, 64, 1000] {
                let table = WindowTable::for_function(function, n).unwrap();
                let direct: f32 = table.values().iter().sum();
                let rel = ((direct - table.sum()) / table.sum()).abs();
                assert!(rel < 1e-5, "{:?} n={} direct={} sum={}", function, n, direct, table.sum());
            }
        }
    }

    #[test]
    fn test_rectangle_window() {
        let table = WindowTable::for_function(WindowFunction::Rectangle, 100).unwrap();
        assert_eq!(table.len(), 100);
        assert!(table.values().iter().all(|&w| w == 1.0));
        assert_eq!(table.sum(), 100.0);

        // A single sample is fine for the rectangle
        let table = WindowTable::for_function(WindowFunction::Rectangle, 1).unwrap();
        assert_eq!(table.sum(), 1.0);
    }

    #[test]
    fn test_symmetric_shapes() {
        let n = 161;
        for function in WindowFunction::ALL {
            let table = WindowTable::for_function(function, n).unwrap();
            let v = table.values();
            for i in 0..n / 2 {
                assert!(
                    (v[i] - v[n - 1 - i]).abs() < 1e-4,
                    "{:?} not symmetric at {}",
                    function,
                    i
                );
            }
        }
    }

    #[test]
    fn test_peak_at_center() {
        let n = 161;
        let center = n / 2;
        for function in [
            WindowFunction::Bartlett,
            WindowFunction::Sine,
            WindowFunction::Hann,
            WindowFunction::Hamming,
            WindowFunction::Welch,
        ] {
            let table = WindowTable::for_function(function, n).unwrap();
            assert!((table.values()[center] - 1.0).abs() < 1e-5, "{:?}", function);
        }
    }

    #[test]
    fn test_hamming_endpoints() {
        let table = WindowTable::for_function(WindowFunction::Hamming, 64).unwrap();
        let expected = HAMMING_A0 - HAMMING_A1;
        assert!((table.values()[0] - expected).abs() < 1e-6);
        assert!((table.values()[63] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_zero_endpoints() {
        for function in [WindowFunction::Bartlett, WindowFunction::Sine, WindowFunction::Hann, WindowFunction::Welch] {
            let table = WindowTable::for_function(function, 33).unwrap();
            assert!(table.values()[0].abs() < 1e-6, "{:?}", function);
        }
    }

    #[test]
    fn test_single_sample_rejected_for_tapered_windows() {
        for function in WindowFunction::ALL.iter().skip(1) {
            let err = WindowTable::for_function(*function, 1).unwrap_err();
            assert!(matches!(err, SpectrumError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_two_sample_frames() {
        // Shapes whose two end points cancel to zero cannot normalize
        let degenerate = [
            WindowFunction::Bartlett,
            WindowFunction::Sine,
            WindowFunction::Hann,
            WindowFunction::Welch,
            WindowFunction::Nuttall,
            WindowFunction::FlatTop,
        ];

        for function in WindowFunction::ALL {
            let result = WindowTable::for_function(function, 2);
            if degenerate.contains(&function) {
                assert!(
                    matches!(result, Err(SpectrumError::InvalidArgument(_))),
                    "{:?}: {:?}",
                    function,
                    result
                );
            } else {
                let table = result.unwrap();
                assert!(table.sum() > 1e-5, "{:?}: {}", function, table.sum());
            }
        }
    }

    #[test]
    fn test_custom_builder_noise_sum_rejected() {
        let builder: WindowBuilder = Box::new(|values: &mut [f32]| {
            values[0] = 1e-9;
            1e-9
        });
        let err = WindowTable::build(WindowSource::Custom(&builder), 16).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidArgument(_)));
    }

    #[test]
    fn test_zero_frame_rejected() {
        let err = WindowTable::for_function(WindowFunction::Rectangle, 0).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidArgument(_)));
    }

    #[test]
    fn test_custom_builder() {
        let builder: WindowBuilder = Box::new(|values: &mut [f32]| {
            for (i, v) in values.iter_mut().enumerate() {
                *v = if i % 2 == 0 { 1.0 } else { 0.5 };
            }
            values.iter().sum()
        });

        let table = WindowTable::build(WindowSource::Custom(&builder), 4).unwrap();
        assert_eq!(table.values(), &[1.0, 0.5, 1.0, 0.5]);
        assert_eq!(table.sum(), 3.0);
    }

    #[test]
    fn test_custom_builder_zero_sum_rejected() {
        let builder: WindowBuilder = Box::new(|_values: &mut [f32]| 0.0);
        let err = WindowTable::build(WindowSource::Custom(&builder), 16).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidArgument(_)));
    }
}
