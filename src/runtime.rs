// runtime.rs - Lifecycle of the embedded interpreter and source execution

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::loader::{self, RuntimeLibrary};
use crate::namespace::Namespace;
use crate::redirect::{self, Sinks, StreamRouter};
use lazy_static::lazy_static;
use pyo3::exceptions::PySystemExit;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

lazy_static! {
    static ref LIFECYCLE: Mutex<Lifecycle> = Mutex::new(Lifecycle::Uninitialized);
}

/// Process-wide state of the embedded interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Live,
    /// Terminal. CPython cannot be restarted reliably once finalized.
    Finalized,
}

pub fn lifecycle() -> Lifecycle {
    *LIFECYCLE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of running a piece of source through [`EmbeddedRuntime::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub success: bool,
    /// `Type: message` of the exception that stopped execution
    pub error: Option<String>,
    /// Everything written to `sys.stdout` during the call
    pub stdout: String,
    /// Everything written to `sys.stderr` during the call, tracebacks included
    pub stderr: String,
}

/// Handle to the live embedded interpreter.
///
/// At most one handle exists per process. All operations block the calling
/// thread for as long as they hold the GIL.
pub struct EmbeddedRuntime {
    pub(crate) config: BridgeConfig,
    pub(crate) stdout: Arc<StreamRouter>,
    pub(crate) stderr: Arc<StreamRouter>,
    exec_lock: Mutex<()>,
    library: Option<RuntimeLibrary>,
}

impl EmbeddedRuntime {
    /// Starts the interpreter with output forwarded to the host console
    pub fn initialize(config: &BridgeConfig) -> Result<Self> {
        Self::initialize_with_sinks(config, Sinks::console())
    }

    /// Starts the interpreter and redirects `sys.stdout` / `sys.stderr` to `sinks`.
    ///
    /// When `global_symbols` is enabled and a `library_path` is configured, the
    /// library is opened `RTLD_GLOBAL` first; a load failure leaves the process
    /// uninitialized so the call can be retried with another path.
    pub fn initialize_with_sinks(config: &BridgeConfig, sinks: Sinks) -> Result<Self> {
        let mut state = LIFECYCLE.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            Lifecycle::Live => return Err(BridgeError::AlreadyInitialized),
            Lifecycle::Finalized => return Err(BridgeError::Finalized),
            Lifecycle::Uninitialized => {}
        }

        info!("Initializing embedded Python runtime");

        let library = match (&config.runtime.library_path, config.runtime.global_symbols) {
            (Some(path), true) => Some(loader::load_global(path)?),
            (Some(path), false) => {
                debug!("global_symbols disabled, not preloading {}", path.display());
                None
            }
            (None, _) => None,
        };

        pyo3::prepare_freethreaded_python();

        let stdout = Arc::new(StreamRouter::new(sinks.stdout));
        let stderr = Arc::new(StreamRouter::new(sinks.stderr));

        Python::with_gil(|py| -> PyResult<()> {
            let ns = Namespace::main(py)?;
            prepend_sys_path(py, &config.runtime.python_path)?;
            redirect::install(py, ns.globals(), &stdout, &stderr)
        })?;

        *state = Lifecycle::Live;
        info!("Embedded Python runtime initialized");

        Ok(EmbeddedRuntime {
            config: config.clone(),
            stdout,
            stderr,
            exec_lock: Mutex::new(()),
            library,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The library preloaded with global symbols, if any
    pub fn library(&self) -> Option<&RuntimeLibrary> {
        self.library.as_ref()
    }

    /// Runs `code` in `__main__` and reports how it went.
    ///
    /// Output is forwarded to the sinks as it is written and also returned in
    /// the outcome. An exception in `code` is not an `Err`: its traceback goes
    /// to stderr and the outcome is marked unsuccessful. `SystemExit` is
    /// reported the same way and never exits the host.
    ///
    /// Calls are serialized; a sink must not call back into the runtime.
    pub fn execute(&self, code: &str) -> Result<ExecOutcome> {
        self.run_captured(code, None)
    }

    /// Fire-and-forget form of [`execute`](Self::execute): failures are only
    /// visible as traceback text on the stderr sink.
    pub fn execute_source(&self, code: &str) {
        match self.run_captured(code, None) {
            Ok(outcome) if !outcome.success => {
                debug!("Python code failed: {}", outcome.error.unwrap_or_default());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to run Python code: {}", e),
        }
    }

    /// Runs a script file in `__main__` with `__file__` bound for the duration
    pub fn execute_file(&self, path: &Path) -> Result<ExecOutcome> {
        let code = std::fs::read_to_string(path)?;
        info!("Running Python script {}", path.display());
        self.run_captured(&code, Some(path))
    }

    fn run_captured(&self, code: &str, file: Option<&Path>) -> Result<ExecOutcome> {
        let _guard = self.exec_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.stdout.begin_capture();
        self.stderr.begin_capture();

        let result = Python::with_gil(|py| -> PyResult<Option<String>> {
            let globals = Namespace::main(py)?.globals();
            let mut previous_file: Option<PyObject> = None;
            if let Some(file) = file {
                previous_file = globals.get_item("__file__")?.map(|obj| obj.into());
                globals.set_item("__file__", file.to_string_lossy().as_ref())?;
            }

            let failure = match py.run(code, Some(globals), None) {
                Ok(()) => None,
                Err(err) => Some(self.report_failure(py, err)),
            };

            match previous_file {
                Some(previous) => globals.set_item("__file__", previous)?,
                None if file.is_some() && globals.contains("__file__")? => {
                    globals.del_item("__file__")?
                }
                None => {}
            }
            Ok(failure)
        });

        self.stdout.flush();
        self.stderr.flush();
        let stdout = self.stdout.end_capture();
        let stderr = self.stderr.end_capture();

        let error = result?;
        Ok(ExecOutcome {
            success: error.is_none(),
            error,
            stdout,
            stderr,
        })
    }

    fn report_failure(&self, py: Python<'_>, err: PyErr) -> String {
        let message = err.to_string();
        if err.is_instance_of::<PySystemExit>(py) {
            // PyErr_Print terminates the process on SystemExit.
            self.stderr.forward(&format!("{}\n", message));
        } else {
            err.print(py);
        }
        debug!("Python code raised {}", message);
        message
    }

    /// Tears the interpreter down. The process can never start another one,
    /// so every later [`initialize`](Self::initialize) fails with
    /// [`BridgeError::Finalized`]; the handle itself is consumed:
    ///
    /// ```compile_fail
    /// # use pybridge::{BridgeConfig, EmbeddedRuntime};
    /// let runtime = EmbeddedRuntime::initialize(&BridgeConfig::default()).unwrap();
    /// runtime.finalize().unwrap();
    /// runtime.execute_source("print('too late')");
    /// ```
    pub fn finalize(self) -> Result<()> {
        let mut state = LIFECYCLE.lock().unwrap_or_else(PoisonError::into_inner);
        info!("Finalizing embedded Python runtime");

        // Stream hooks stay installed: atexit handlers and finalizers print
        // from inside Py_FinalizeEx. `self` keeps the routers alive until then.
        //
        // SAFETY: this thread takes the GIL and never releases it; no handle
        // remains that could run Python code afterwards.
        let status = unsafe {
            pyo3::ffi::PyGILState_Ensure();
            pyo3::ffi::Py_FinalizeEx()
        };
        if status != 0 {
            warn!("Py_FinalizeEx reported an error while flushing buffered data");
        }

        *state = Lifecycle::Finalized;
        drop(state);
        info!("Embedded Python runtime finalized");
        Ok(())
    }
}

impl Drop for EmbeddedRuntime {
    fn drop(&mut self) {
        let mut state = LIFECYCLE.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == Lifecycle::Live {
            // Without finalize() the interpreter keeps running; a new handle
            // may be created and reinstalls its own sinks.
            debug!("Dropping EmbeddedRuntime handle without finalizing");
            *state = Lifecycle::Uninitialized;
        }
    }
}

fn prepend_sys_path(py: Python<'_>, dirs: &[PathBuf]) -> PyResult<()> {
    if dirs.is_empty() {
        return Ok(());
    }
    let sys_path = py.import("sys")?.getattr("path")?.downcast::<PyList>()?;
    for dir in dirs.iter().rev() {
        debug!("Adding {} to sys.path", dir.display());
        sys_path.insert(0, dir.to_string_lossy().as_ref())?;
    }
    Ok(())
}
