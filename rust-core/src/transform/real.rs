//! Real-input FFT backend using realfft
//!
//! Optimized for real-time spectral analysis: the plan owns its work and
//! scratch buffers, so running it never allocates.

use std::sync::Arc;

use num_complex::Complex;
use parking_lot::Mutex;
use realfft::{FftError, RealFftPlanner, RealToComplex};

use super::TransformBackend;
use crate::error::{Result, SpectrumError};

/// Plan for one slot
pub struct RealFftPlan {
    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f32>>,

    /// Private copy of the input; realfft uses its input as scratch space
    work: Vec<f32>,

    /// Reusable scratch for `process_with_scratch`
    scratch: Vec<Complex<f32>>,
}

impl RealFftPlan {
    pub fn len(&self) -> usize {
        self.r2c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r2c.len() == 0
    }
}

/// CPU backend built on a shared realfft planner
///
/// Plans for the same length share twiddle tables through the planner cache.
pub struct RealFftBackend {
    planner: Mutex<RealFftPlanner<f32>>,
}

impl RealFftBackend {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(RealFftPlanner::<f32>::new()),
        }
    }
}

impl Default for RealFftBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable numeric code for each realfft failure
fn fft_error_code(err: &FftError) -> i32 {
    match err {
        FftError::InputBuffer(..) => 1,
        FftError::OutputBuffer(..) => 2,
        FftError::ScratchBuffer(..) => 3,
        FftError::InputValues(..) => 4,
    }
}

impl TransformBackend for RealFftBackend {
    type Plan = RealFftPlan;

    fn name(&self) -> &'static str {
        "realfft"
    }

    fn create_plan(&self, len: usize) -> Result<RealFftPlan> {
        if len == 0 {
            return Err(SpectrumError::PlanCreate { len, code: 0 });
        }

        let r2c = self.planner.lock().plan_fft_forward(len);
        let work = r2c.make_input_vec();
        let scratch = r2c.make_scratch_vec();

        Ok(RealFftPlan { r2c, work, scratch })
    }

    fn run(&self, plan: &mut RealFftPlan, input: &[f32], output: &mut [Complex<f32>]) -> Result<()> {
        plan.work.copy_from_slice(input);
        plan.r2c
            .process_with_scratch(&mut plan.work, output, &mut plan.scratch)
            .map_err(|e| SpectrumError::Backend {
                backend: "realfft",
                code: fft_error_code(&e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::plan_lock;
    use std::f32::consts::PI;

    fn plan(backend: &RealFftBackend, len: usize) -> RealFftPlan {
        let _guard = plan_lock();
        backend.create_plan(len).unwrap()
    }

    #[test]
    fn test_fft_dc_signal() {
        let backend = RealFftBackend::new();
        let mut plan = plan(&backend, 1024);

        // DC signal (constant) over the first 100 samples, rest zero-padded
        let mut signal = vec![0.0f32; 1024];
        signal[..100].fill(1.0);

        let mut output = vec![Complex::new(0.0, 0.0); 513];
        backend.run(&mut plan, &signal, &mut output).unwrap();

        // DC bin should hold the sum of the samples
        assert!((output[0].norm() - 100.0).abs() < 1e-3);
        assert!(output[10].norm() < 100.0);
    }

    #[test]
    fn test_fft_sine_wave() {
        let backend = RealFftBackend::new();
        let mut plan = plan(&backend, 1024);

        let signal: Vec<f32> = (0..1024)
            .map(|n| (2.0 * PI * 51.0 * n as f32 / 1024.0).sin())
            .collect();

        let mut output = vec![Complex::new(0.0, 0.0); 513];
        backend.run(&mut plan, &signal, &mut output).unwrap();

        let (peak_bin, peak) = output
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().partial_cmp(&b.norm()).unwrap())
            .unwrap();

        assert_eq!(peak_bin, 51);
        // Bin-aligned sine of amplitude 1 gives N/2
        assert!((peak.norm() - 512.0).abs() < 0.5);
    }

    #[test]
    fn test_input_left_untouched() {
        let backend = RealFftBackend::new();
        let mut plan = plan(&backend, 16);

        let signal: Vec<f32> = (0..16).map(|n| n as f32).collect();
        let copy = signal.clone();

        let mut output = vec![Complex::new(0.0, 0.0); 9];
        backend.run(&mut plan, &signal, &mut output).unwrap();
        assert_eq!(signal, copy);
    }

    #[test]
    fn test_wrong_output_length() {
        let backend = RealFftBackend::new();
        let mut plan = plan(&backend, 16);

        let signal = vec![0.0f32; 16];
        let mut output = vec![Complex::new(0.0, 0.0); 4];
        let err = backend.run(&mut plan, &signal, &mut output).unwrap_err();
        assert_eq!(err.api_status(), 2);
    }

    #[test]
    fn test_zero_length_plan_rejected() {
        let backend = RealFftBackend::new();
        let _guard = plan_lock();
        assert!(matches!(
            backend.create_plan(0),
            Err(SpectrumError::PlanCreate { len: 0, .. })
        ));
    }
}
