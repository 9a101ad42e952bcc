// value.rs - Tagged representation of values crossing the boundary

use crate::marshal;
use pyo3::prelude::*;
use pyo3::AsPyPointer;
use pyo3::types::{PyBool, PyBytes, PyFloat, PyList, PyLong, PyString, PyTuple};
use std::fmt;

/// A value on the host side of the bridge.
///
/// Everything the marshaller understands gets its own variant; any other
/// interpreter object is carried as an `Opaque` reference, which stays valid
/// only while the runtime is alive.
#[derive(Debug, Clone)]
pub enum Value {
    NumericSequence(Vec<f64>),
    StringSequence(Vec<String>),
    ScalarNumeric(f64),
    ScalarString(String),
    Opaque(PyObject),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::NumericSequence(_) => "numeric sequence",
            Value::StringSequence(_) => "string sequence",
            Value::ScalarNumeric(_) => "numeric scalar",
            Value::ScalarString(_) => "string scalar",
            Value::Opaque(_) => "opaque object",
        }
    }

    pub fn to_py(&self, py: Python<'_>) -> PyObject {
        match self {
            Value::NumericSequence(values) => marshal::numeric_sequence_to_py(py, values).into(),
            Value::StringSequence(values) => marshal::string_sequence_to_py(py, values).into(),
            Value::ScalarNumeric(value) => value.to_object(py),
            Value::ScalarString(value) => value.to_object(py),
            Value::Opaque(obj) => obj.clone_ref(py),
        }
    }

    /// Classifies `obj` by shape. Lists and tuples become sequences when every
    /// element is numeric (or every element is text); an empty list is a
    /// numeric sequence. Anything else is `Opaque`.
    pub fn from_py(obj: &PyAny) -> PyResult<Value> {
        if is_text(obj) {
            return Ok(Value::ScalarString(marshal::scalar_string_from_py(obj)?));
        }
        if is_number(obj) {
            // Ints too large for a double stay opaque instead of failing.
            if let Ok(value) = marshal::scalar_numeric_from_py(obj) {
                return Ok(Value::ScalarNumeric(value));
            }
            return Ok(Value::Opaque(obj.into()));
        }
        if obj.is_instance_of::<PyList>() || obj.is_instance_of::<PyTuple>() {
            let items: Vec<&PyAny> = obj.iter()?.collect::<PyResult<_>>()?;
            if items.iter().all(|item| is_number(item)) {
                if let Ok(values) = marshal::numeric_sequence_from_py(obj) {
                    return Ok(Value::NumericSequence(values));
                }
            } else if items.iter().all(|item| is_text(item)) {
                return Ok(Value::StringSequence(marshal::string_sequence_from_py(obj)?));
            }
        }
        Ok(Value::Opaque(obj.into()))
    }
}

fn is_text(obj: &PyAny) -> bool {
    obj.is_instance_of::<PyString>() || obj.is_instance_of::<PyBytes>()
}

fn is_number(obj: &PyAny) -> bool {
    obj.is_instance_of::<PyFloat>() || obj.is_instance_of::<PyLong>() || obj.is_instance_of::<PyBool>()
}

/// Opaque values compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::NumericSequence(a), Value::NumericSequence(b)) => a == b,
            (Value::StringSequence(a), Value::StringSequence(b)) => a == b,
            (Value::ScalarNumeric(a), Value::ScalarNumeric(b)) => a == b,
            (Value::ScalarString(a), Value::ScalarString(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.as_ptr() == b.as_ptr(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NumericSequence(values) => write!(f, "{:?}", values),
            Value::StringSequence(values) => write!(f, "{:?}", values),
            Value::ScalarNumeric(value) => write!(f, "{}", value),
            Value::ScalarString(value) => write!(f, "{:?}", value),
            Value::Opaque(obj) => Python::with_gil(|py| write!(f, "{}", obj.as_ref(py))),
        }
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::NumericSequence(values)
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Value::NumericSequence(values.to_vec())
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::StringSequence(values)
    }
}

impl From<&[&str]> for Value {
    fn from(values: &[&str]) -> Self {
        Value::StringSequence(values.iter().map(|s| s.to_string()).collect())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::ScalarNumeric(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::ScalarString(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::ScalarString(value.to_string())
    }
}
