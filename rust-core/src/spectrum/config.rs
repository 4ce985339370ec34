//! Engine configuration

use super::windows::WindowFunction;
use crate::error::{Result, SpectrumError};

/// Spectrum engine configuration
///
/// Fixed once the engine is constructed. Nothing is checked here;
/// `SpectrumEngine::initialize` calls [`EngineConfig::layout`] and fails
/// permanently on a bad value.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window applied to every frame before the transform
    pub window: WindowFunction,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Samples per frame
    pub frame_size: usize,

    /// Transform length; 0 means "same as `frame_size`"
    pub padded_frame_size: usize,

    /// Frames per batch, one worker each
    pub batch_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowFunction::Rectangle,
            sample_rate: 48000,
            frame_size: 1024,
            padded_frame_size: 0,
            batch_count: 1,
        }
    }
}

impl EngineConfig {
    pub fn new(window: WindowFunction, sample_rate: u32, frame_size: usize, padded_frame_size: usize, batch_count: usize) -> Self {
        Self {
            window,
            sample_rate,
            frame_size,
            padded_frame_size,
            batch_count,
        }
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_padded_frame_size(mut self, padded_frame_size: usize) -> Self {
        self.padded_frame_size = padded_frame_size;
        self
    }

    pub fn with_batch_count(mut self, batch_count: usize) -> Self {
        self.batch_count = batch_count;
        self
    }

    /// Transform length after resolving the 0 shorthand
    pub fn effective_padded_frame_size(&self) -> usize {
        if self.padded_frame_size == 0 {
            self.frame_size
        } else {
            self.padded_frame_size
        }
    }

    /// Validate and derive the buffer layout
    pub fn layout(&self) -> Result<FrameLayout> {
        if self.sample_rate == 0 {
            return Err(SpectrumError::InvalidArgument("sample rate must be greater than 0".into()));
        }
        if self.frame_size == 0 {
            return Err(SpectrumError::InvalidArgument("frame size must be greater than 0".into()));
        }
        if self.batch_count == 0 {
            return Err(SpectrumError::InvalidArgument("batch count must be at least 1".into()));
        }

        let padded_frame_size = self.effective_padded_frame_size();
        if padded_frame_size < self.frame_size {
            return Err(SpectrumError::InvalidArgument(format!(
                "padded frame size {} is smaller than frame size {}",
                padded_frame_size, self.frame_size
            )));
        }

        Ok(FrameLayout {
            frame_size: self.frame_size,
            padded_frame_size,
            bin_count: padded_frame_size / 2,
            batch_count: self.batch_count,
        })
    }
}

/// Validated sizes of the staging and output buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame_size: usize,
    pub padded_frame_size: usize,
    pub bin_count: usize,
    pub batch_count: usize,
}

impl FrameLayout {
    /// Complex values per slot in the output buffer
    pub fn output_slot_len(&self) -> usize {
        self.bin_count + 1
    }

    /// Real samples across all staging slots
    pub fn staging_len(&self) -> usize {
        self.batch_count * self.padded_frame_size
    }

    /// Complex values across all output slots
    pub fn output_len(&self) -> usize {
        self.batch_count * self.output_slot_len()
    }
}
