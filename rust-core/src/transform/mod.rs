//! Transform backends
//!
//! A backend turns one padded frame of real samples into `len/2 + 1`
//! complex bins. The batch coordinator creates one plan per worker slot and
//! drives it from that worker's thread only.

pub mod complex;
pub mod real;

pub use complex::ComplexFftBackend;
pub use real::RealFftBackend;

use num_complex::Complex;
use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;

/// Process-wide lock around plan creation and destruction
///
/// Held across every engine instance, so it serializes plan management
/// between engines as well as between slots of one engine. Transform
/// execution never takes it.
static PLAN_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Acquire the process-wide plan lock
pub fn plan_lock() -> MutexGuard<'static, ()> {
    PLAN_LOCK.lock()
}

#[cfg(test)]
pub(crate) fn plan_lock_held() -> bool {
    PLAN_LOCK.is_locked()
}

/// Forward real-to-complex transform provider
pub trait TransformBackend: Send + Sync + 'static {
    /// Per-slot transform state: twiddles, scratch, work buffers
    type Plan: Send + 'static;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Bring up whatever the backend needs before plans can be created
    ///
    /// Called once per engine, before any plan. The coordinator reports any
    /// error from here as `TransportCreate`, keeping its status code.
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Create a plan for a transform of `len` real samples
    ///
    /// Always called with [`plan_lock`] held.
    fn create_plan(&self, len: usize) -> Result<Self::Plan>;

    /// Run one transform
    ///
    /// `input` holds `len` samples and is left untouched; `output` receives
    /// `len/2 + 1` bins. Must not allocate.
    fn run(&self, plan: &mut Self::Plan, input: &[f32], output: &mut [Complex<f32>]) -> Result<()>;
}
