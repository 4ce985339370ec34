//! Batched spectrum engine
//!
//! Ties the window table, the worker pool and bin post-processing together
//! behind one initialize / execute / read contract.

use std::sync::Arc;

use ndarray::Array2;
use tracing::{error, info, warn};

use super::bins::{self, BinHook};
use super::config::EngineConfig;
use super::windows::{WindowBuilder, WindowSource, WindowTable};
use crate::batch::{BatchBuffers, BatchCoordinator};
use crate::error::{InitStatus, Result, SpectrumError};
use crate::transform::{RealFftBackend, TransformBackend};

enum EngineState<B: TransformBackend> {
    Constructed,
    Ready(BatchCoordinator<B>),
    Failed,
}

/// Windowed, batched magnitude spectra of 16-bit audio frames
///
/// ```no_run
/// use batched_spectrum::{EngineConfig, SpectrumEngine, WindowFunction};
///
/// let config = EngineConfig::default()
///     .with_window(WindowFunction::Hann)
///     .with_frame_size(512)
///     .with_batch_count(4);
///
/// let mut engine: SpectrumEngine = SpectrumEngine::new(config);
/// engine.initialize().unwrap();
///
/// let samples = vec![0i16; 512 * 4];
/// assert!(engine.execute(&samples));
/// let peak = engine.bin_value(2, 10);
/// ```
pub struct SpectrumEngine<B: TransformBackend = RealFftBackend> {
    config: EngineConfig,
    backend: Arc<B>,
    window_builder: Option<WindowBuilder>,
    bin_hook: Option<BinHook>,
    state: EngineState<B>,
    executed: bool,
}

impl<B: TransformBackend + Default> SpectrumEngine<B> {
    /// Create an engine with a default-constructed backend
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, B::default())
    }
}

impl<B: TransformBackend> SpectrumEngine<B> {
    /// Create an engine on an explicit backend
    ///
    /// Nothing is validated or allocated until [`initialize`](Self::initialize).
    pub fn with_backend(config: EngineConfig, backend: B) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            window_builder: None,
            bin_hook: None,
            state: EngineState::Constructed,
            executed: false,
        }
    }

    /// Replace the built-in window with a custom builder
    ///
    /// The builder receives a zeroed slice of `frame_size` multipliers and
    /// returns their sum. Only takes effect if set before `initialize`.
    pub fn set_window_builder<F>(&mut self, builder: F)
    where
        F: Fn(&mut [f32]) -> f32 + Send + Sync + 'static,
    {
        if !matches!(self.state, EngineState::Constructed) {
            warn!("window builder set after initialize(); it will not be used");
        }
        self.window_builder = Some(Box::new(builder));
    }

    /// Register a hook that may rewrite every value returned by `bin_value`
    pub fn set_bin_hook<F>(&mut self, hook: F)
    where
        F: Fn(usize, &mut f32) + Send + Sync + 'static,
    {
        self.bin_hook = Some(Box::new(hook));
    }

    pub fn clear_bin_hook(&mut self) {
        self.bin_hook = None;
    }

    /// Validate the configuration, build the window table, allocate the
    /// buffers and start the worker pool
    ///
    /// A second call after success is a no-op returning
    /// `InitStatus::AlreadyInitialized`. Any failure is permanent: every
    /// later call returns `PreviousInitializeFailed` without retrying.
    pub fn initialize(&mut self) -> Result<InitStatus> {
        match self.state {
            EngineState::Failed => return Err(SpectrumError::PreviousInitializeFailed),
            EngineState::Ready(_) => return Ok(InitStatus::AlreadyInitialized),
            EngineState::Constructed => {}
        }

        match self.bring_up() {
            Ok(coordinator) => {
                info!(
                    "spectrum engine ready: {} Hz, frame {}, padded {}, batch {}, backend '{}'",
                    self.config.sample_rate,
                    self.frame_size(),
                    self.padded_frame_size(),
                    self.batch_count(),
                    self.backend.name()
                );
                self.state = EngineState::Ready(coordinator);
                Ok(InitStatus::Initialized)
            }
            Err(err) => {
                error!("spectrum engine initialization failed: {}", err);
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }

    fn bring_up(&self) -> Result<BatchCoordinator<B>> {
        let layout = self.config.layout()?;

        let source = match &self.window_builder {
            Some(builder) => WindowSource::Custom(builder),
            None => WindowSource::Builtin(self.config.window),
        };
        let window = WindowTable::build(source, layout.frame_size)?;

        let buffers = BatchBuffers::allocate(&layout)?;

        BatchCoordinator::start(Arc::clone(&self.backend), layout, window, buffers)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// True once `initialize` has failed; the engine must be discarded
    pub fn has_failed(&self) -> bool {
        matches!(self.state, EngineState::Failed)
    }

    /// Run one batch from a flat buffer of `batch_count × frame_size` samples
    ///
    /// Frame `k` is `samples[k * frame_size..(k + 1) * frame_size]`.
    /// Returns false if the engine is not initialized or the batch failed.
    pub fn execute(&mut self, samples: &[i16]) -> bool {
        self.report(|engine| engine.try_execute(samples))
    }

    /// Run one batch from `batch_count` separate frames
    pub fn execute_frames(&mut self, frames: &[&[i16]]) -> bool {
        self.report(|engine| engine.try_execute_frames(frames))
    }

    fn report<F>(&mut self, run: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        match run(self) {
            Ok(()) => true,
            Err(err) => {
                warn!("execute failed: {}", err);
                false
            }
        }
    }

    /// [`execute`](Self::execute) with the reason for failure
    pub fn try_execute(&mut self, samples: &[i16]) -> Result<()> {
        let EngineState::Ready(coordinator) = &mut self.state else {
            return Err(SpectrumError::NotInitialized);
        };

        coordinator.submit_flat(samples)?;
        self.executed = true;
        Ok(())
    }

    /// [`execute_frames`](Self::execute_frames) with the reason for failure
    pub fn try_execute_frames(&mut self, frames: &[&[i16]]) -> Result<()> {
        let EngineState::Ready(coordinator) = &mut self.state else {
            return Err(SpectrumError::NotInitialized);
        };

        coordinator.submit(frames)?;
        self.executed = true;
        Ok(())
    }

    /// True after at least one successful execute
    pub fn has_results(&self) -> bool {
        self.executed
    }

    /// Calibrated magnitude of `bin` in slot `batch_index`
    ///
    /// `sqrt(re² + im²) * 2 / window_sum`, then the bin hook if one is set.
    /// `bin` ranges over `0..=bin_count`. Before the first successful
    /// execute the output buffer is all zeros; before initialize this
    /// returns 0.
    pub fn bin_value(&self, batch_index: usize, bin: usize) -> f32 {
        let EngineState::Ready(coordinator) = &self.state else {
            return 0.0;
        };

        let bin_count = self.bin_count();
        debug_assert!(batch_index < self.batch_count(), "batch index {} out of range", batch_index);
        debug_assert!(bin <= bin_count, "bin {} out of range (bin count {})", bin, bin_count);

        let value = coordinator.output()[bins::output_offset(batch_index, bin, bin_count)];
        bins::compute(bin, value, coordinator.window().sum(), self.bin_hook.as_ref())
    }

    /// [`bin_value`](Self::bin_value) for slot 0
    pub fn bin_value_single(&self, bin: usize) -> f32 {
        self.bin_value(0, bin)
    }

    /// All `bin_count + 1` magnitudes of one slot
    pub fn spectrum(&self, batch_index: usize) -> Vec<f32> {
        (0..=self.bin_count()).map(|bin| self.bin_value(batch_index, bin)).collect()
    }

    /// Magnitudes of one slot in dB relative to `reference`
    pub fn spectrum_db(&self, batch_index: usize, reference: f32) -> Vec<f32> {
        self.spectrum(batch_index)
            .into_iter()
            .map(|mag| bins::magnitude_to_db(mag, reference))
            .collect()
    }

    /// Magnitudes of the whole batch, shape `(batch_count, bin_count + 1)`
    pub fn magnitudes(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.batch_count(), self.bin_count() + 1), |(batch, bin)| {
            self.bin_value(batch, bin)
        })
    }

    /// Index of the strongest bin of one slot
    pub fn peak_bin(&self, batch_index: usize) -> usize {
        self.spectrum(batch_index)
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (bin, &mag)| if mag > best.1 { (bin, mag) } else { best })
            .0
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    /// Transform length, with the 0 shorthand resolved
    pub fn padded_frame_size(&self) -> usize {
        self.config.effective_padded_frame_size()
    }

    pub fn batch_count(&self) -> usize {
        self.config.batch_count
    }

    /// `padded_frame_size / 2`; valid bins are `0..=bin_count`
    pub fn bin_count(&self) -> usize {
        self.padded_frame_size() / 2
    }

    /// Hz between adjacent bins
    pub fn frequency_step(&self) -> f32 {
        self.config.sample_rate as f32 / self.padded_frame_size() as f32
    }

    /// Centre frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.frequency_step()
    }

    /// Frequency axis in Hz for `0..=bin_count`
    pub fn frequencies_hz(&self) -> Vec<f32> {
        (0..=self.bin_count()).map(|bin| self.bin_frequency(bin)).collect()
    }

    /// Window table, once initialized
    pub fn window_table(&self) -> Option<&WindowTable> {
        match &self.state {
            EngineState::Ready(coordinator) => Some(coordinator.window()),
            _ => None,
        }
    }

    pub fn window_sum(&self) -> Option<f32> {
        self.window_table().map(|w| w.sum())
    }
}
