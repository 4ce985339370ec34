//! PyO3 bindings for Python integration

use pyo3::prelude::*;

mod spectrum_bindings;
mod window_bindings;

/// Python module definition
#[pymodule]
fn batched_spectrum(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrum_bindings::PySpectrumEngine>()?;
    m.add_class::<window_bindings::PyWindowFunction>()?;
    m.add_function(wrap_pyfunction!(window_bindings::window_table, m)?)?;

    Ok(())
}
