//! Process bootstrap shared by the stage binaries.
//!
//! Loading settings happens before tracing exists, so load problems are kept
//! and reported once the subscriber is installed. A malformed or missing
//! settings file never stops a worker from starting; it runs on defaults.
//! Invalid values in a file that parsed fall back to their defaults one key
//! at a time. `--validate` turns any of these into an error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use logrelay_core::{Config, ConfigCell, ConfigError};

use crate::cli::CommonArgs;
use crate::logging::init_tracing;
use crate::metrics_server::install_metrics_recorder;

/// Settings as loaded from disk, before logging is up.
#[derive(Debug)]
pub struct LoadedConfig {
    /// File that was read, if any.
    pub path: Option<PathBuf>,
    /// Effective settings (defaults when loading failed).
    pub config: Config,
    /// Read or parse failure, reported after tracing is initialized.
    pub error: Option<ConfigError>,
    /// Invalid values that were reset to their defaults.
    pub problems: Vec<ConfigError>,
}

impl LoadedConfig {
    /// Apply `--log-level` / `--log-format` on top of the loaded settings.
    pub fn apply_overrides(&mut self, args: &CommonArgs) {
        if let Some(level) = &args.log_level {
            self.config.log_level = level.clone();
        }
        if let Some(format) = &args.log_format {
            self.config.log_format = format.clone();
        }
    }
}

/// Locate and load the settings file.
///
/// `--config` wins over `LOGRELAY_CONFIG_FILE`. Without either, defaults are used.
pub fn load_config(args: &CommonArgs) -> LoadedConfig {
    let path = ConfigCell::with_override(args.config.clone()).source_path();

    let Some(file) = path.as_deref() else {
        return LoadedConfig {
            path,
            config: Config::default(),
            error: None,
            problems: Vec::new(),
        };
    };

    match Config::read(file) {
        Ok(mut config) => {
            let problems = config.repair();
            LoadedConfig {
                path,
                config,
                error: None,
                problems,
            }
        }
        Err(e) => LoadedConfig {
            path,
            config: Config::default(),
            error: Some(e),
            problems: Vec::new(),
        },
    }
}

/// Strict check used by `--validate`.
pub fn validate_config(args: &CommonArgs) -> Result<LoadedConfig> {
    let loaded = load_config(args);
    let first = loaded.error.as_ref().or(loaded.problems.first());
    if let Some(e) = first {
        let path = loaded
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        return Err(anyhow::anyhow!("configuration invalid ({}): {}", path, e));
    }
    loaded.config.validate()?;
    Ok(loaded)
}

/// Switch to the configured `home` directory, if any.
///
/// Relative plugin paths and `spool://` directories resolve against it.
pub fn enter_home(config: &Config) -> Result<()> {
    let home = config
        .enter_home()
        .context("failed to enter home directory")?;
    if let Some(home) = home {
        tracing::info!(home = %home.display(), "working directory set");
    }
    Ok(())
}

/// Load settings, initialize logging and metrics.
///
/// Returns `None` when `--validate` was given and the file checked out;
/// the caller should exit without starting workers.
pub fn bootstrap(args: &CommonArgs, process: &str) -> Result<Option<Arc<Config>>> {
    if args.validate {
        let loaded = validate_config(args)?;
        match &loaded.path {
            Some(path) => println!("configuration is valid: {}", path.display()),
            None => println!("no configuration file given; defaults are valid"),
        }
        return Ok(None);
    }

    let mut loaded = load_config(args);
    loaded.apply_overrides(args);

    init_tracing(&loaded.config.log_level, &loaded.config.log_format)?;

    if let Some(e) = &loaded.error {
        tracing::error!(
            path = ?loaded.path,
            error = %e,
            "failed to load config, using defaults"
        );
    }
    for problem in &loaded.problems {
        tracing::warn!(
            path = ?loaded.path,
            error = %problem,
            "invalid config value, using default"
        );
    }

    enter_home(&loaded.config)?;

    if let Some(addr) = &loaded.config.metrics_addr {
        install_metrics_recorder(addr)?;
    }

    tracing::info!(
        process,
        version = env!("CARGO_PKG_VERSION"),
        config = ?loaded.path,
        broker_url = %loaded.config.broker_url,
        "starting"
    );

    Ok(Some(Arc::new(loaded.config)))
}
