//! Full complex FFT backend using rustfft
//!
//! Promotes the real frame to complex, runs an in-place forward transform of
//! the whole length and keeps the non-negative half of the spectrum. Slower
//! than [`RealFftBackend`](super::RealFftBackend), mainly useful as an
//! independent reference.

use std::sync::Arc;

use num_complex::Complex;
use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner};

use super::TransformBackend;
use crate::error::{Result, SpectrumError};

pub struct ComplexFftPlan {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

pub struct ComplexFftBackend {
    planner: Mutex<FftPlanner<f32>>,
}

impl ComplexFftBackend {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }
}

impl Default for ComplexFftBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformBackend for ComplexFftBackend {
    type Plan = ComplexFftPlan;

    fn name(&self) -> &'static str {
        "rustfft"
    }

    fn create_plan(&self, len: usize) -> Result<ComplexFftPlan> {
        if len == 0 {
            return Err(SpectrumError::PlanCreate { len, code: 0 });
        }

        let fft = self.planner.lock().plan_fft_forward(len);
        let buffer = vec![Complex::new(0.0, 0.0); len];
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(ComplexFftPlan { fft, buffer, scratch })
    }

    fn run(&self, plan: &mut ComplexFftPlan, input: &[f32], output: &mut [Complex<f32>]) -> Result<()> {
        let len = plan.buffer.len();
        if input.len() != len {
            return Err(SpectrumError::Backend { backend: "rustfft", code: 1 });
        }
        if output.len() != len / 2 + 1 {
            return Err(SpectrumError::Backend { backend: "rustfft", code: 2 });
        }

        for (c, &x) in plan.buffer.iter_mut().zip(input.iter()) {
            *c = Complex::new(x, 0.0);
        }

        plan.fft.process_with_scratch(&mut plan.buffer, &mut plan.scratch);
        output.copy_from_slice(&plan.buffer[..output.len()]);

        Ok(())
    }
}
