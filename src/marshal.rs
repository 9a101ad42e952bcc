// marshal.rs - Conversions between host containers and Python objects

use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyList};

/// Returned by scalar numeric fetches when the name is unbound
pub const NOT_AVAILABLE: f64 = f64::NAN;

/// `&[f64]` -> `list[float]`. NaN and infinities are kept as Python floats.
pub fn numeric_sequence_to_py<'py>(py: Python<'py>, values: &[f64]) -> &'py PyList {
    PyList::new(py, values)
}

/// `&[str]` -> `list[str]`
pub fn string_sequence_to_py<'py, S: AsRef<str>>(py: Python<'py>, values: &[S]) -> &'py PyList {
    PyList::new(py, values.iter().map(<S as AsRef<str>>::as_ref))
}

/// Any object with `len()` and integer indexing -> `Vec<f64>`.
///
/// Elements go through Python's own float coercion, so ints and objects with
/// `__float__` are accepted; anything else raises the interpreter's TypeError.
pub fn numeric_sequence_from_py(obj: &PyAny) -> PyResult<Vec<f64>> {
    let len = obj.len()?;
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(scalar_numeric_from_py(obj.get_item(i)?)?);
    }
    Ok(values)
}

/// Any object with `len()` and integer indexing -> `Vec<String>`
pub fn string_sequence_from_py(obj: &PyAny) -> PyResult<Vec<String>> {
    let len = obj.len()?;
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(scalar_string_from_py(obj.get_item(i)?)?);
    }
    Ok(values)
}

pub fn scalar_numeric_from_py(obj: &PyAny) -> PyResult<f64> {
    obj.extract::<f64>()
}

/// `bytes` is the interpreter's narrow string and is decoded as UTF-8;
/// everything else must be a `str`.
pub fn scalar_string_from_py(obj: &PyAny) -> PyResult<String> {
    if let Ok(bytes) = obj.downcast::<PyBytes>() {
        return Ok(String::from_utf8_lossy(bytes.as_bytes()).into_owned());
    }
    obj.extract::<String>()
}
