// lib.rs - Module exports for pybridge

pub mod bridge;
pub mod config;
pub mod error;
pub mod loader;
pub mod marshal;
pub mod namespace;
pub mod redirect;
pub mod runtime;
pub mod value;

// Re-exports
pub use config::{BridgeConfig, GroupMode, NamespaceSettings, RuntimeSettings, DEFAULT_CONFIG_FILE};
pub use error::{BridgeError, Result};
pub use loader::RuntimeLibrary;
pub use marshal::NOT_AVAILABLE;
pub use namespace::Namespace;
pub use redirect::{CaptureSink, ConsoleSink, HostStream, OutputSink, Sinks};
pub use runtime::{lifecycle, EmbeddedRuntime, ExecOutcome, Lifecycle};
pub use value::Value;
