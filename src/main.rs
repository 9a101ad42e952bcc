// main.rs - Runs Python scripts inside the embedded runtime
//
// Usage: pybridge [SCRIPT]...
// With no scripts, the program source is read from stdin.

use anyhow::{Context, Result};
use pybridge::{BridgeConfig, EmbeddedRuntime, ExecOutcome, DEFAULT_CONFIG_FILE};
use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    // Load configuration
    let config = BridgeConfig::load(Path::new(DEFAULT_CONFIG_FILE))
        .context("Invalid configuration")?;
    info!("Configuration loaded: {:?}", config);

    let scripts: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();

    let runtime = EmbeddedRuntime::initialize(&config)
        .context("Failed to initialize Python runtime")?;

    let mut failed = false;
    if scripts.is_empty() {
        let mut source = String::new();
        match io::stdin().read_to_string(&mut source) {
            Ok(_) => failed |= !report("<stdin>", runtime.execute(&source)),
            Err(e) => {
                error!("Failed to read Python source from stdin: {}", e);
                failed = true;
            }
        }
    } else {
        for script in &scripts {
            failed |= !report(&script.display().to_string(), runtime.execute_file(script));
        }
    }

    runtime.finalize()?;

    if failed {
        process::exit(1);
    }
    Ok(())
}

fn report(source: &str, result: pybridge::Result<ExecOutcome>) -> bool {
    match result {
        Ok(outcome) => {
            match &outcome.error {
                Some(e) => error!("{} failed: {}", source, e),
                None => info!("{} finished", source),
            }
            outcome.success
        }
        Err(e) => {
            error!("Failed to run {}: {}", source, e);
            false
        }
    }
}
