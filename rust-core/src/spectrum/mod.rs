//! Windowed, batched spectral magnitudes

pub mod bins;
pub mod config;
pub mod engine;
pub mod windowing;
pub mod windows;

pub use bins::BinHook;
pub use config::{EngineConfig, FrameLayout};
pub use engine::SpectrumEngine;
pub use windows::{WindowBuilder, WindowFunction, WindowTable};
