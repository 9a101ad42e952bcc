// Tests that create and drop their own runtime. They run one at a time because
// only one live runtime may exist per process.

use pybridge::{
    lifecycle, BridgeConfig, BridgeError, CaptureSink, EmbeddedRuntime, GroupMode, Lifecycle,
    Sinks,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn capture_sinks() -> (Sinks, Arc<CaptureSink>, Arc<CaptureSink>) {
    let stdout = Arc::new(CaptureSink::new());
    let stderr = Arc::new(CaptureSink::new());
    (Sinks::new(stdout.clone(), stderr.clone()), stdout, stderr)
}

#[test]
fn test_library_load_failure_can_be_retried() {
    let _serial = serial();

    let mut config = BridgeConfig::default();
    config.runtime.library_path = Some(PathBuf::from("/nonexistent/pybridge/libpython9.9.so"));
    config.runtime.global_symbols = true;

    match EmbeddedRuntime::initialize(&config) {
        Err(BridgeError::LibraryLoad { path, reason }) => {
            assert_eq!(path, PathBuf::from("/nonexistent/pybridge/libpython9.9.so"));
            assert!(!reason.is_empty());
        }
        Err(other) => panic!("expected LibraryLoad, got {:?}", other),
        Ok(_) => panic!("a missing library must not load"),
    }
    assert_eq!(lifecycle(), Lifecycle::Uninitialized);

    // Without global symbols the path is not preloaded at all.
    config.runtime.global_symbols = false;
    let runtime = EmbeddedRuntime::initialize(&config).expect("retry should succeed");
    assert!(runtime.library().is_none());
    assert_eq!(lifecycle(), Lifecycle::Live);
}

/// Asks the interpreter where its shared library lives. `None` for static
/// builds or when the file is missing.
fn shared_libpython() -> Option<PathBuf> {
    let (sinks, _, _) = capture_sinks();
    let runtime = EmbeddedRuntime::initialize_with_sinks(&BridgeConfig::default(), sinks).unwrap();
    runtime
        .execute(
            "import os, sysconfig\n\
             libpython_path = os.path.join(sysconfig.get_config_var('LIBDIR') or '', \
             sysconfig.get_config_var('LDLIBRARY') or '')",
        )
        .unwrap();
    let path = PathBuf::from(runtime.fetch_scalar_string("libpython_path").unwrap());
    drop(runtime);

    let shared = path.extension().map_or(false, |ext| ext != "a");
    (shared && path.is_file()).then_some(path)
}

#[test]
fn test_preloads_libpython_with_global_symbols() {
    let _serial = serial();

    let Some(libpython) = shared_libpython() else {
        eprintln!("skipping: interpreter has no shared libpython");
        return;
    };

    let mut config = BridgeConfig::default();
    config.runtime.library_path = Some(libpython.clone());
    config.runtime.global_symbols = true;
    let (sinks, stdout, _) = capture_sinks();
    let runtime = EmbeddedRuntime::initialize_with_sinks(&config, sinks)
        .expect("preloading the interpreter's own library should succeed");

    assert_eq!(runtime.library().map(|lib| lib.path()), Some(libpython.as_path()));

    let outcome = runtime.execute("import math\nprint(math.sqrt(16))").unwrap();
    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.stdout, "4.0\n");
    assert_eq!(stdout.contents(), "4.0\n");
}

#[test]
fn test_dropping_handle_allows_new_runtime_with_new_sinks() {
    let _serial = serial();

    let (sinks, first_out, _) = capture_sinks();
    let first = EmbeddedRuntime::initialize_with_sinks(&BridgeConfig::default(), sinks).unwrap();
    first.execute_source("print('first')");
    drop(first);
    assert_eq!(lifecycle(), Lifecycle::Uninitialized);

    let (sinks, second_out, _) = capture_sinks();
    let second = EmbeddedRuntime::initialize_with_sinks(&BridgeConfig::default(), sinks).unwrap();
    second.execute_source("print('second')");

    assert_eq!(first_out.contents(), "first\n");
    assert_eq!(second_out.contents(), "second\n");
}

#[test]
fn test_strict_group_mode_rejects_non_dict() {
    let _serial = serial();

    let config = BridgeConfig::default().with_group_mode(GroupMode::Strict);
    let (sinks, _, _) = capture_sinks();
    let runtime = EmbeddedRuntime::initialize_with_sinks(&config, sinks).unwrap();

    runtime.publish_scalar_numeric("strict_g", 1.0).unwrap();
    match runtime.publish_numeric_into_group("a", "strict_g", &[2.0]) {
        Err(BridgeError::GroupConflict { group, found }) => {
            assert_eq!(group, "strict_g");
            assert_eq!(found, "float");
        }
        other => panic!("expected GroupConflict, got {:?}", other),
    }
    assert_eq!(runtime.fetch_scalar_numeric("strict_g").unwrap(), 1.0);

    runtime.publish_numeric_into_group("a", "strict_fresh", &[2.0]).unwrap();
    runtime.publish_strings_into_group("b", "strict_fresh", &["y"]).unwrap();
    assert_eq!(runtime.fetch_group("strict_fresh").unwrap().unwrap().len(), 2);
}

#[test]
fn test_python_path_is_prepended() {
    let _serial = serial();

    let dir = std::env::temp_dir().join(format!("pybridge_path_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("pybridge_helper_mod.py"), "ANSWER = 42.0\n").unwrap();

    let mut config = BridgeConfig::default();
    config.runtime.python_path = vec![dir.clone()];
    let (sinks, _, _) = capture_sinks();
    let runtime = EmbeddedRuntime::initialize_with_sinks(&config, sinks).unwrap();

    let outcome = runtime
        .execute("import sys\nfrom pybridge_helper_mod import ANSWER\nhelper_first = sys.path[0]")
        .unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(runtime.fetch_scalar_numeric("ANSWER").unwrap(), 42.0);
    assert_eq!(
        runtime.fetch_scalar_string("helper_first").unwrap(),
        dir.to_string_lossy()
    );
}
