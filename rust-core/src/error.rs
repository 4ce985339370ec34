//! Error and status types for the spectrum engine

use thiserror::Error;

/// Backend status used when the transform library gave no code of its own
pub const UNKNOWN_API_STATUS: i32 = -1;

/// Non-error outcomes of `SpectrumEngine::initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// Buffers, window table and worker pool are ready
    Initialized,

    /// `initialize` already succeeded earlier; nothing was changed
    AlreadyInitialized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpectrumError {
    #[error("A previous initialize() failed; the engine is unusable and must be rebuilt")]
    PreviousInitializeFailed,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to allocate {what} ({len} elements)")]
    AllocFailed { what: &'static str, len: usize },

    #[error("Failed to spawn worker thread for slot {slot}: {reason}")]
    WorkerSpawn { slot: usize, reason: String },

    #[error("Failed to create transport for backend '{backend}' (status {code})")]
    TransportCreate { backend: &'static str, code: i32 },

    #[error("Failed to create plan of length {len} (status {code})")]
    PlanCreate { len: usize, code: i32 },

    #[error("Backend '{backend}' reported status {code}")]
    Backend { backend: &'static str, code: i32 },

    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("Expected {expected} samples, found {found}")]
    FrameLength { expected: usize, found: usize },

    #[error("Expected {expected} frames, found {found}")]
    BatchLength { expected: usize, found: usize },
}

impl SpectrumError {
    /// Status code reported by the wrapped transform library, or
    /// [`UNKNOWN_API_STATUS`] when the failure did not come from it
    pub fn api_status(&self) -> i32 {
        match self {
            SpectrumError::TransportCreate { code, .. }
            | SpectrumError::PlanCreate { code, .. }
            | SpectrumError::Backend { code, .. } => *code,
            _ => UNKNOWN_API_STATUS,
        }
    }

    /// True for errors that leave the engine permanently unusable
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SpectrumError::NotInitialized
                | SpectrumError::FrameLength { .. }
                | SpectrumError::BatchLength { .. }
                | SpectrumError::Backend { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
