// loader.rs - Preloads the Python shared library with global symbol visibility
//
// Extension modules (numpy, spacy, ...) are linked against libpython symbols
// but do not link libpython themselves. When the interpreter is embedded they
// can only resolve those symbols if libpython was opened RTLD_GLOBAL.

use crate::error::{BridgeError, Result};
use libloading::Library;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Keeps the preloaded library mapped for the lifetime of the runtime
#[derive(Debug, Clone)]
pub struct RuntimeLibrary {
    path: PathBuf,
    _lib: Arc<Library>,
}

impl RuntimeLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn open_global(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: libpython initializers do not depend on interpreter state.
    let lib = unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL)? };
    Ok(Library::from(lib))
}

#[cfg(not(unix))]
fn open_global(path: &Path) -> std::result::Result<Library, libloading::Error> {
    // Windows has no RTLD_GLOBAL; exported symbols are always visible.
    unsafe { Library::new(path) }
}

/// Opens `path` with `RTLD_NOW | RTLD_GLOBAL`. The error carries the
/// platform loader's message.
pub fn load_global(path: &Path) -> Result<RuntimeLibrary> {
    debug!("Loading Python library with global symbols: {}", path.display());

    let lib = open_global(path).map_err(|e| BridgeError::LibraryLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Python library loaded: {}", path.display());
    Ok(RuntimeLibrary {
        path: path.to_path_buf(),
        _lib: Arc::new(lib),
    })
}
