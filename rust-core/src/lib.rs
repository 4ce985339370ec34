//! Batched Spectrum - Windowed FFT Magnitudes for 16-bit Audio
//!
//! Runs a batch of audio frames through a fixed pool of transform workers,
//! one per frame, and reads back calibrated per-bin magnitudes.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod batch;
pub mod error;
pub mod spectrum;
pub mod transform;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use error::{InitStatus, Result, SpectrumError};
pub use spectrum::{EngineConfig, SpectrumEngine, WindowFunction, WindowTable};
pub use transform::{ComplexFftBackend, RealFftBackend, TransformBackend};
