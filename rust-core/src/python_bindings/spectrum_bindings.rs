//! Python bindings for the batched spectrum engine

use pyo3::prelude::*;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use numpy::{PyArray1, PyArray2, PyReadonlyArray1};
use crate::error::InitStatus;
use crate::spectrum::{EngineConfig, SpectrumEngine};
use super::window_bindings::PyWindowFunction;

/// Spectrum engine exposed to Python
#[pyclass(name = "SpectrumEngine")]
pub struct PySpectrumEngine {
    engine: SpectrumEngine,
}

#[pymethods]
impl PySpectrumEngine {
    /// Create a new spectrum engine
    ///
    /// Args:
    ///     window: Window function applied to every frame
    ///     sample_rate: Sample rate in Hz
    ///     frame_size: Samples per frame
    ///     padded_frame_size: Transform length (0 = frame_size)
    ///     batch_count: Frames per batch
    #[new]
    #[pyo3(signature = (window=PyWindowFunction::Rectangle, sample_rate=48000, frame_size=1024, padded_frame_size=0, batch_count=1))]
    fn new(
        window: PyWindowFunction,
        sample_rate: u32,
        frame_size: usize,
        padded_frame_size: usize,
        batch_count: usize,
    ) -> Self {
        let config = EngineConfig::new(window.into(), sample_rate, frame_size, padded_frame_size, batch_count);

        Self {
            engine: SpectrumEngine::new(config),
        }
    }

    /// Start the worker pool
    ///
    /// Returns:
    ///     True if this call initialized the engine, False if it already was
    fn initialize(&mut self) -> PyResult<bool> {
        match self.engine.initialize() {
            Ok(InitStatus::Initialized) => Ok(true),
            Ok(InitStatus::AlreadyInitialized) => Ok(false),
            Err(e) => Err(PyErr::new::<PyRuntimeError, _>(e.to_string())),
        }
    }

    /// Run one batch
    ///
    /// Args:
    ///     samples: int16 numpy array of batch_count * frame_size samples
    ///
    /// Returns:
    ///     True on success
    fn execute(&mut self, py: Python<'_>, samples: PyReadonlyArray1<i16>) -> PyResult<bool> {
        let samples = samples
            .as_slice()
            .map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))?;
        let engine = &mut self.engine;

        Ok(py.allow_threads(move || engine.execute(samples)))
    }

    /// Calibrated magnitude of one bin
    #[pyo3(signature = (bin, batch_index=0))]
    fn bin_value(&self, bin: usize, batch_index: usize) -> PyResult<f32> {
        if batch_index >= self.engine.batch_count() || bin > self.engine.bin_count() {
            return Err(PyErr::new::<PyValueError, _>("bin or batch index out of range"));
        }
        Ok(self.engine.bin_value(batch_index, bin))
    }

    /// Magnitudes of one slot as numpy array
    #[pyo3(signature = (batch_index=0))]
    fn spectrum<'py>(&self, py: Python<'py>, batch_index: usize) -> PyResult<&'py PyArray1<f32>> {
        if batch_index >= self.engine.batch_count() {
            return Err(PyErr::new::<PyValueError, _>("batch index out of range"));
        }
        Ok(PyArray1::from_vec(py, self.engine.spectrum(batch_index)))
    }

    /// Magnitudes of the whole batch, shape (batch_count, bin_count + 1)
    fn magnitudes<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        PyArray2::from_owned_array(py, self.engine.magnitudes())
    }

    /// Frequency axis in Hz
    fn frequencies_hz<'py>(&self, py: Python<'py>) -> &'py PyArray1<f32> {
        PyArray1::from_vec(py, self.engine.frequencies_hz())
    }

    /// Register a callable(bin, value) -> float applied to every bin value
    fn set_bin_hook(&mut self, callback: PyObject) {
        self.engine.set_bin_hook(move |bin, value| {
            Python::with_gil(|py| {
                match callback.call1(py, (bin, *value)).and_then(|r| r.extract::<f32>(py)) {
                    Ok(v) => *value = v,
                    Err(e) => e.print(py),
                }
            })
        });
    }

    fn clear_bin_hook(&mut self) {
        self.engine.clear_bin_hook();
    }

    fn bin_frequency(&self, bin: usize) -> f32 {
        self.engine.bin_frequency(bin)
    }

    fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn frame_size(&self) -> usize {
        self.engine.frame_size()
    }

    fn padded_frame_size(&self) -> usize {
        self.engine.padded_frame_size()
    }

    fn batch_count(&self) -> usize {
        self.engine.batch_count()
    }

    fn bin_count(&self) -> usize {
        self.engine.bin_count()
    }
}
