// Shared runtime for integration tests.
//
// The interpreter is process-wide, so every test in a file shares one
// runtime; tests must use names no other test in the file uses.

use pybridge::{BridgeConfig, CaptureSink, EmbeddedRuntime, Sinks};
use std::sync::{Arc, OnceLock};

pub struct Fixture {
    pub runtime: EmbeddedRuntime,
    pub stdout: Arc<CaptureSink>,
    pub stderr: Arc<CaptureSink>,
}

static FIXTURE: OnceLock<Fixture> = OnceLock::new();

pub fn fixture() -> &'static Fixture {
    FIXTURE.get_or_init(|| {
        let stdout = Arc::new(CaptureSink::new());
        let stderr = Arc::new(CaptureSink::new());
        let runtime = EmbeddedRuntime::initialize_with_sinks(
            &BridgeConfig::default(),
            Sinks::new(stdout.clone(), stderr.clone()),
        )
        .expect("Failed to initialize embedded Python");
        Fixture {
            runtime,
            stdout,
            stderr,
        }
    })
}

#[allow(dead_code)]
pub fn runtime() -> &'static EmbeddedRuntime {
    &fixture().runtime
}
