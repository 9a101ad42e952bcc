// namespace.rs - Publish/fetch on the interpreter's global scope

use crate::config::GroupMode;
use crate::error::{BridgeError, Result};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use pyo3::PyNativeType;
use tracing::debug;

/// String-keyed view over a globals dict, normally `__main__.__dict__`
#[derive(Clone, Copy)]
pub struct Namespace<'py> {
    globals: &'py PyDict,
}

impl<'py> Namespace<'py> {
    pub fn main(py: Python<'py>) -> PyResult<Self> {
        let globals = PyModule::import(py, "__main__")?.dict();
        Ok(Namespace { globals })
    }

    pub fn new(globals: &'py PyDict) -> Self {
        Namespace { globals }
    }

    pub fn globals(&self) -> &'py PyDict {
        self.globals
    }

    /// Binds `name`, replacing whatever was there
    pub fn publish(&self, name: &str, value: &PyAny) -> PyResult<()> {
        self.globals.set_item(name, value)
    }

    /// `None` when `name` is unbound. Never raises.
    pub fn fetch(&self, name: &str) -> Option<&'py PyAny> {
        self.globals.get_item(name).ok().flatten()
    }

    /// Returns the dict bound at `group`, if there is one
    pub fn group(&self, group: &str) -> Option<&'py PyDict> {
        self.fetch(group).and_then(|obj| obj.downcast::<PyDict>().ok())
    }

    /// Sets `name` inside the dict bound at `group`, creating the dict when
    /// needed, then rebinds `group`.
    ///
    /// A non-dict value already bound at `group` is discarded in
    /// `GroupMode::Lenient` and rejected in `GroupMode::Strict`. The
    /// read-modify-write is not transactional.
    pub fn publish_into_group(
        &self,
        name: &str,
        group: &str,
        value: &PyAny,
        mode: GroupMode,
    ) -> Result<()> {
        let dict = match self.fetch(group) {
            Some(existing) => match existing.downcast::<PyDict>() {
                Ok(dict) => dict,
                Err(_) if mode == GroupMode::Strict => {
                    return Err(BridgeError::GroupConflict {
                        group: group.to_string(),
                        found: existing.get_type().name()?.to_string(),
                    });
                }
                Err(_) => {
                    debug!("Replacing non-dict binding '{}' with a new group", group);
                    PyDict::new(self.globals.py())
                }
            },
            None => PyDict::new(self.globals.py()),
        };

        dict.set_item(name, value)?;
        self.globals.set_item(group, dict)?;
        Ok(())
    }
}
