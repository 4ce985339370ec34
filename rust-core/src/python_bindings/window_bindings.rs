//! Python bindings for window selection

use pyo3::prelude::*;
use numpy::PyArray1;
use crate::spectrum::{WindowFunction, WindowTable};

/// Window function enum exposed to Python
#[pyclass(name = "WindowFunction")]
#[derive(Clone)]
pub enum PyWindowFunction {
    Rectangle,
    Triangular,
    Bartlett,
    Sine,
    Hann,
    Hamming,
    Welch,
    Blackman,
    Nuttall,
    BlackmanNuttall,
    BlackmanHarris,
    FlatTop,
}

impl From<PyWindowFunction> for WindowFunction {
    fn from(py_win: PyWindowFunction) -> Self {
        match py_win {
            PyWindowFunction::Rectangle => WindowFunction::Rectangle,
            PyWindowFunction::Triangular => WindowFunction::Triangular,
            PyWindowFunction::Bartlett => WindowFunction::Bartlett,
            PyWindowFunction::Sine => WindowFunction::Sine,
            PyWindowFunction::Hann => WindowFunction::Hann,
            PyWindowFunction::Hamming => WindowFunction::Hamming,
            PyWindowFunction::Welch => WindowFunction::Welch,
            PyWindowFunction::Blackman => WindowFunction::Blackman,
            PyWindowFunction::Nuttall => WindowFunction::Nuttall,
            PyWindowFunction::BlackmanNuttall => WindowFunction::BlackmanNuttall,
            PyWindowFunction::BlackmanHarris => WindowFunction::BlackmanHarris,
            PyWindowFunction::FlatTop => WindowFunction::FlatTop,
        }
    }
}

/// Generate window multipliers
///
/// Args:
///     window: Window function
///     frame_size: Number of samples
///
/// Returns:
///     Tuple of (multipliers as numpy array, sum of multipliers)
#[pyfunction]
pub fn window_table<'py>(
    py: Python<'py>,
    window: PyWindowFunction,
    frame_size: usize,
) -> PyResult<(&'py PyArray1<f32>, f32)> {
    let table = WindowTable::for_function(window.into(), frame_size)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;

    Ok((PyArray1::from_slice(py, table.values()), table.sum()))
}
