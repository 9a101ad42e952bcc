// config.rs - Bridge configuration (TOML file + PYBRIDGE_* environment)

use crate::error::Result;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file looked up by the `pybridge` binary
pub const DEFAULT_CONFIG_FILE: &str = "pybridge.toml";

const ENV_PREFIX: &str = "PYBRIDGE";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub runtime: RuntimeSettings,
    pub namespace: NamespaceSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Shared Python library to preload before the interpreter starts
    pub library_path: Option<PathBuf>,
    /// Load `library_path` with RTLD_GLOBAL so extension modules can resolve
    /// symbols against the interpreter
    pub global_symbols: bool,
    /// Directories prepended to `sys.path` after start
    pub python_path: Vec<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        RuntimeSettings {
            library_path: None,
            global_symbols: cfg!(all(unix, not(target_os = "macos"))),
            python_path: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NamespaceSettings {
    pub group_mode: GroupMode,
}

/// What to do when a group name is already bound to something that is not a dict
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// Discard the old binding and start a fresh group
    #[default]
    Lenient,
    /// Refuse the write with `BridgeError::GroupConflict`
    Strict,
}

impl BridgeConfig {
    /// Loads the TOML file at `path` (if it exists) layered under `PYBRIDGE_*`
    /// environment variables, e.g. `PYBRIDGE_RUNTIME__GLOBAL_SYMBOLS=false`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading bridge configuration from {}", path.display());

        let config: BridgeConfig = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        debug!("Bridge configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn with_group_mode(mut self, mode: GroupMode) -> Self {
        self.namespace.group_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_lenient_without_library() {
        let config = BridgeConfig::default();
        assert_eq!(config.namespace.group_mode, GroupMode::Lenient);
        assert!(config.runtime.library_path.is_none());
        assert!(config.runtime.python_path.is_empty());
        assert_eq!(
            config.runtime.global_symbols,
            cfg!(all(unix, not(target_os = "macos")))
        );
    }

    #[test]
    fn test_from_toml_reads_all_sections() {
        let config = BridgeConfig::from_toml(
            r#"
            [runtime]
            library_path = "/opt/python/lib/libpython3.12.so"
            global_symbols = false
            python_path = ["scripts", "lib/py"]

            [namespace]
            group_mode = "strict"
            "#,
        )
        .expect("valid config");

        assert_eq!(
            config.runtime.library_path,
            Some(PathBuf::from("/opt/python/lib/libpython3.12.so"))
        );
        assert!(!config.runtime.global_symbols);
        assert_eq!(
            config.runtime.python_path,
            vec![PathBuf::from("scripts"), PathBuf::from("lib/py")]
        );
        assert_eq!(config.namespace.group_mode, GroupMode::Strict);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml("[namespace]\ngroup_mode = \"strict\"\n")
            .expect("valid config");
        assert_eq!(config.namespace.group_mode, GroupMode::Strict);
        assert!(config.runtime.library_path.is_none());
    }

    #[test]
    fn test_unknown_group_mode_is_rejected() {
        let result = BridgeConfig::from_toml("[namespace]\ngroup_mode = \"sloppy\"\n");
        assert!(result.is_err(), "group_mode must be lenient or strict");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("pybridge-config-that-does-not-exist.toml");
        let config = BridgeConfig::load(&path).expect("missing file falls back to defaults");
        assert!(config.runtime.library_path.is_none());
    }
}
