// redirect.rs - Forwards the interpreter's sys.stdout / sys.stderr to host sinks

use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Name of the stdout callable registered in `__main__`
pub const STDOUT_HOOK: &str = "_host_stdout";
/// Name of the stderr callable registered in `__main__`
pub const STDERR_HOOK: &str = "_host_stderr";

/// Python's stream protocol wants an object with `write`, not a bare callable,
/// so the hooks are wrapped in two small classes and installed on `sys`.
pub const BOOTSTRAP: &str = r#"
import sys as _host_sys

class _StdoutCatcher:
    encoding = "utf-8"
    def write(self, out):
        return _host_stdout(out)
    def flush(self):
        pass
    def isatty(self):
        return False

class _StderrCatcher:
    encoding = "utf-8"
    def write(self, out):
        return _host_stderr(out)
    def flush(self):
        pass
    def isatty(self):
        return False

_host_sys.stdout = _StdoutCatcher()
_host_sys.stderr = _StderrCatcher()
del _host_sys
"#;

/// Host-side consumer of interpreter output.
///
/// Writes arrive in the order the interpreter produced them, but chunking is
/// arbitrary: `print("a", "b")` usually shows up as four separate writes.
pub trait OutputSink: Send + Sync {
    fn write(&self, text: &str);

    fn flush(&self) {}
}

impl<F> OutputSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, text: &str) {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStream {
    Stdout,
    Stderr,
}

/// Writes to the host process's own stdout or stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    stream: HostStream,
}

impl ConsoleSink {
    pub fn new(stream: HostStream) -> Self {
        ConsoleSink { stream }
    }
}

impl OutputSink for ConsoleSink {
    fn write(&self, text: &str) {
        let result = match self.stream {
            HostStream::Stdout => io::stdout().lock().write_all(text.as_bytes()),
            HostStream::Stderr => io::stderr().lock().write_all(text.as_bytes()),
        };
        if let Err(e) = result {
            warn!("Failed to forward Python output to host {:?}: {}", self.stream, e);
        }
    }

    fn flush(&self) {
        let result = match self.stream {
            HostStream::Stdout => io::stdout().flush(),
            HostStream::Stderr => io::stderr().flush(),
        };
        if let Err(e) = result {
            warn!("Failed to flush host {:?}: {}", self.stream, e);
        }
    }
}

/// Collects everything written into an in-memory buffer
#[derive(Debug, Default)]
pub struct CaptureSink {
    buffer: Mutex<String>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl OutputSink for CaptureSink {
    fn write(&self, text: &str) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }
}

/// The pair of sinks a runtime forwards to
#[derive(Clone)]
pub struct Sinks {
    pub stdout: Arc<dyn OutputSink>,
    pub stderr: Arc<dyn OutputSink>,
}

impl Sinks {
    pub fn new(stdout: Arc<dyn OutputSink>, stderr: Arc<dyn OutputSink>) -> Self {
        Sinks { stdout, stderr }
    }

    pub fn console() -> Self {
        Sinks {
            stdout: Arc::new(ConsoleSink::new(HostStream::Stdout)),
            stderr: Arc::new(ConsoleSink::new(HostStream::Stderr)),
        }
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Self::console()
    }
}

/// Fans one interpreter stream out to its sink and, while an `execute` call
/// is in flight, to a per-call capture buffer.
pub struct StreamRouter {
    sink: Arc<dyn OutputSink>,
    capture: Mutex<Option<String>>,
}

impl StreamRouter {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        StreamRouter {
            sink,
            capture: Mutex::new(None),
        }
    }

    pub fn forward(&self, text: &str) {
        self.sink.write(text);
        if let Some(buffer) = self
            .capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            buffer.push_str(text);
        }
    }

    /// Writes straight to the sink, bypassing any capture in progress
    pub fn notify(&self, text: &str) {
        self.sink.write(text);
    }

    pub fn flush(&self) {
        self.sink.flush();
    }

    pub fn begin_capture(&self) {
        *self.capture.lock().unwrap_or_else(PoisonError::into_inner) = Some(String::new());
    }

    pub fn end_capture(&self) -> String {
        self.capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default()
    }
}

/// Callable installed as `_host_stdout` / `_host_stderr`
#[pyclass(name = "HostStreamHook", module = "pybridge")]
pub struct RedirectHook {
    router: Arc<StreamRouter>,
}

#[pymethods]
impl RedirectHook {
    fn __call__(&self, text: &str) -> usize {
        self.router.forward(text);
        text.chars().count()
    }
}

/// Registers both hooks into `globals`, then runs the bootstrap that rebinds
/// `sys.stdout` and `sys.stderr`. Hooks must exist before the bootstrap runs.
pub fn install(
    py: Python<'_>,
    globals: &PyDict,
    stdout: &Arc<StreamRouter>,
    stderr: &Arc<StreamRouter>,
) -> PyResult<()> {
    let out_hook = Py::new(py, RedirectHook { router: Arc::clone(stdout) })?;
    let err_hook = Py::new(py, RedirectHook { router: Arc::clone(stderr) })?;
    globals.set_item(STDOUT_HOOK, out_hook)?;
    globals.set_item(STDERR_HOOK, err_hook)?;

    py.run(BOOTSTRAP, Some(globals), None)?;
    debug!("Python stdout/stderr redirected to host sinks");
    Ok(())
}
