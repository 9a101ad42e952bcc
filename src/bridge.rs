// bridge.rs - Host-facing publish/fetch operations on EmbeddedRuntime
//
// Publishing always overwrites. Typed fetches never fail on an unknown name:
// they write a diagnostic to the stderr sink and return an empty value.
// Shape mismatches are not checked up front; the interpreter's own coercion
// error is returned instead.

use crate::error::Result;
use crate::marshal::{self, NOT_AVAILABLE};
use crate::namespace::Namespace;
use crate::runtime::EmbeddedRuntime;
use crate::value::Value;
use pyo3::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl EmbeddedRuntime {
    // =================== Publish ===================

    pub fn publish_numeric(&self, name: &str, values: &[f64]) -> Result<()> {
        debug!("Publishing {} numbers as '{}'", values.len(), name);
        self.publish_object(name, None, |py| marshal::numeric_sequence_to_py(py, values).into())
    }

    pub fn publish_strings<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<()> {
        debug!("Publishing {} strings as '{}'", values.len(), name);
        self.publish_object(name, None, |py| marshal::string_sequence_to_py(py, values).into())
    }

    pub fn publish_scalar_numeric(&self, name: &str, value: f64) -> Result<()> {
        self.publish_object(name, None, |py| value.to_object(py))
    }

    pub fn publish_scalar_string(&self, name: &str, value: &str) -> Result<()> {
        self.publish_object(name, None, |py| value.to_object(py))
    }

    pub fn publish_value(&self, name: &str, value: &Value) -> Result<()> {
        debug!("Publishing {} as '{}'", value.kind(), name);
        self.publish_object(name, None, |py| value.to_py(py))
    }

    /// Stores `values` under `name` inside the dict bound at `group`
    pub fn publish_numeric_into_group(&self, name: &str, group: &str, values: &[f64]) -> Result<()> {
        debug!("Publishing {} numbers as '{}' in group '{}'", values.len(), name, group);
        self.publish_object(name, Some(group), |py| {
            marshal::numeric_sequence_to_py(py, values).into()
        })
    }

    pub fn publish_strings_into_group<S: AsRef<str>>(
        &self,
        name: &str,
        group: &str,
        values: &[S],
    ) -> Result<()> {
        debug!("Publishing {} strings as '{}' in group '{}'", values.len(), name, group);
        self.publish_object(name, Some(group), |py| {
            marshal::string_sequence_to_py(py, values).into()
        })
    }

    pub fn publish_value_into_group(&self, name: &str, group: &str, value: &Value) -> Result<()> {
        debug!("Publishing {} as '{}' in group '{}'", value.kind(), name, group);
        self.publish_object(name, Some(group), |py| value.to_py(py))
    }

    fn publish_object<F>(&self, name: &str, group: Option<&str>, make: F) -> Result<()>
    where
        F: FnOnce(Python<'_>) -> PyObject,
    {
        Python::with_gil(|py| -> Result<()> {
            let ns = Namespace::main(py)?;
            let obj = make(py);
            match group {
                Some(group) => {
                    ns.publish_into_group(name, group, obj.as_ref(py), self.config.namespace.group_mode)
                }
                None => Ok(ns.publish(name, obj.as_ref(py))?),
            }
        })
    }

    // =================== Fetch ===================

    /// Empty on an unknown name
    pub fn fetch_numeric_sequence(&self, name: &str) -> Result<Vec<f64>> {
        self.fetch_with(name, Vec::new(), marshal::numeric_sequence_from_py)
    }

    /// Empty on an unknown name
    pub fn fetch_string_sequence(&self, name: &str) -> Result<Vec<String>> {
        self.fetch_with(name, Vec::new(), marshal::string_sequence_from_py)
    }

    /// Empty string on an unknown name
    pub fn fetch_scalar_string(&self, name: &str) -> Result<String> {
        self.fetch_with(name, String::new(), marshal::scalar_string_from_py)
    }

    /// [`NOT_AVAILABLE`] (NaN) on an unknown name
    pub fn fetch_scalar_numeric(&self, name: &str) -> Result<f64> {
        self.fetch_with(name, NOT_AVAILABLE, marshal::scalar_numeric_from_py)
    }

    /// Classified fetch. `None` on an unknown name, without a diagnostic.
    pub fn fetch_value(&self, name: &str) -> Result<Option<Value>> {
        Python::with_gil(|py| -> Result<Option<Value>> {
            let ns = Namespace::main(py)?;
            Ok(ns.fetch(name).map(Value::from_py).transpose()?)
        })
    }

    /// Members of the group bound at `group`. `None` when unbound or not a dict.
    pub fn fetch_group(&self, group: &str) -> Result<Option<BTreeMap<String, Value>>> {
        Python::with_gil(|py| -> Result<Option<BTreeMap<String, Value>>> {
            let ns = Namespace::main(py)?;
            let Some(dict) = ns.group(group) else {
                return Ok(None);
            };
            let mut members = BTreeMap::new();
            for (key, value) in dict.iter() {
                members.insert(key.str()?.to_string(), Value::from_py(value)?);
            }
            Ok(Some(members))
        })
    }

    fn fetch_with<T, F>(&self, name: &str, missing: T, convert: F) -> Result<T>
    where
        F: FnOnce(&PyAny) -> PyResult<T>,
    {
        Python::with_gil(|py| -> Result<T> {
            match Namespace::main(py)?.fetch(name) {
                Some(obj) => Ok(convert(obj)?),
                None => {
                    self.report_unknown(name);
                    Ok(missing)
                }
            }
        })
    }

    fn report_unknown(&self, name: &str) {
        warn!("Unknown Python variable: {}", name);
        self.stderr
            .notify(&format!("Error: Unknown Python variable '{}'\n", name));
    }
}
