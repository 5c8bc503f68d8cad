//! Logging setup for Tessera binaries.
//!
//! Libraries in the workspace only emit `tracing` events; this crate decides
//! where they go. The console always receives them. Debug builds can also
//! write a JSON log for later inspection when `debug.log_to_file` is set.

use std::path::{Path, PathBuf};

use tessera_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log.
pub const LOG_FILE_NAME: &str = "tessera.log";

/// Resolved logging decisions, before any subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directives applied when `RUST_LOG` is unset.
    pub filter: String,
    /// Destination of the JSON log, if one should be written.
    pub json_file: Option<PathBuf>,
}

impl LogSettings {
    /// Derive settings from the optional config and build flavour.
    ///
    /// A JSON file is only requested for debug builds that were given a
    /// log directory and whose config (if any) enables `log_to_file`.
    pub fn resolve(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> Self {
        let filter = match config {
            Some(config) if !config.debug.log_level.trim().is_empty() => {
                config.debug.log_level.trim().to_owned()
            }
            _ => DEFAULT_FILTER.to_owned(),
        };
        let wants_file = debug_build && config.is_none_or(|c| c.debug.log_to_file);
        let json_file = log_dir
            .filter(|_| wants_file)
            .map(|dir| dir.join(LOG_FILE_NAME));
        Self { filter, json_file }
    }

    /// `RUST_LOG` if set and valid, otherwise [`filter`](Self::filter).
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global `tracing` subscriber.
///
/// Console output carries the uptime, target, level and thread name (pool
/// workers are named `chunk-gen-worker`). If the JSON file cannot be
/// created, logging continues on the console alone.
///
/// # Examples
///
/// ```no_run
/// use tessera_config::Config;
/// use tessera_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let settings = LogSettings::resolve(log_dir, debug_build, config);

    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());
    let registry = tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(console);

    let file = settings.json_file.as_deref().and_then(open_log_file);
    match file {
        Some(file) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(fmt::time::uptime()),
            )
            .init(),
        None => registry.init(),
    }
}

fn open_log_file(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    std::fs::File::create(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_comes_from_config() {
        let mut config = Config::default();
        config.debug.log_level = " warn,tessera_terrain=trace ".to_owned();
        let settings = LogSettings::resolve(None, false, Some(&config));
        assert_eq!(settings.filter, "warn,tessera_terrain=trace");
    }

    #[test]
    fn test_blank_level_uses_default() {
        let mut config = Config::default();
        config.debug.log_level.clear();
        assert_eq!(LogSettings::resolve(None, false, Some(&config)).filter, DEFAULT_FILTER);
        assert_eq!(LogSettings::resolve(None, false, None).filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_json_file_only_in_debug_builds() {
        let dir = Path::new("/tmp/tessera-logs");
        let config = Config::default();
        assert_eq!(
            LogSettings::resolve(Some(dir), true, Some(&config)).json_file,
            Some(dir.join(LOG_FILE_NAME))
        );
        assert_eq!(LogSettings::resolve(Some(dir), false, Some(&config)).json_file, None);
        assert_eq!(LogSettings::resolve(None, true, Some(&config)).json_file, None);
    }

    #[test]
    fn test_log_to_file_switch() {
        let dir = Path::new("/tmp/tessera-logs");
        let mut config = Config::default();
        config.debug.log_to_file = false;
        assert_eq!(LogSettings::resolve(Some(dir), true, Some(&config)).json_file, None);
        assert!(LogSettings::resolve(Some(dir), true, None).json_file.is_some());
    }

    #[test]
    fn test_terrain_directives_parse() {
        for directive in [
            "info",
            "debug,tessera_terrain=trace",
            "warn,tessera_terrain::profile=debug,tessera_terrain::cache=trace",
        ] {
            assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
        }
    }

    #[test]
    fn test_log_file_created_in_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(LOG_FILE_NAME);
        assert!(open_log_file(&path).is_some());
        assert!(path.is_file());
    }
}
