use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;

use gridlens_core::config::default_config_path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "gridlens.log";
const DEFAULT_FILTER: &str = "warn,gridlens_app=info,gridlens_tui=info,gridlens_core=info,gridlens_adapters=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub default_filter: String,
}

impl LoggingConfig {
    /// `GRIDLENS_LOG_DIR` wins; otherwise logs sit next to the grid config.
    pub fn from_env() -> Self {
        let config_dir = default_config_path()
            .ok()
            .and_then(|path| path.parent().map(PathBuf::from));
        Self {
            log_dir: resolve_log_dir(env::var_os("GRIDLENS_LOG_DIR"), config_dir),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

fn resolve_log_dir(override_dir: Option<OsString>, config_dir: Option<PathBuf>) -> PathBuf {
    if let Some(custom) = override_dir.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(custom);
    }
    config_dir.map_or_else(
        || env::temp_dir().join("gridlens").join("logs"),
        |dir| dir.join("logs"),
    )
}

/// Routes tracing output to a daily rolling file. The terminal belongs to the
/// grid, so nothing is written to stdout or stderr. Keep the guard alive
/// until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> io::Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|error| io::Error::other(error.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{resolve_log_dir, LoggingConfig, DEFAULT_FILTER};

    #[test]
    fn explicit_log_dir_overrides_config_dir() {
        let resolved = resolve_log_dir(
            Some(OsString::from("/var/log/gridlens")),
            Some(PathBuf::from("/home/u/.config/gridlens")),
        );
        assert_eq!(resolved, PathBuf::from("/var/log/gridlens"));
    }

    #[test]
    fn log_dir_defaults_next_to_config() {
        let resolved = resolve_log_dir(
            Some(OsString::new()),
            Some(PathBuf::from("/home/u/.config/gridlens")),
        );
        assert_eq!(resolved, PathBuf::from("/home/u/.config/gridlens/logs"));

        let fallback = resolve_log_dir(None, None);
        assert!(fallback.ends_with("gridlens/logs"));
    }

    #[test]
    fn default_filter_covers_workspace_crates() {
        let config = LoggingConfig::from_env();
        assert_eq!(config.default_filter, DEFAULT_FILTER);
        for target in ["gridlens_core", "gridlens_tui", "gridlens_adapters"] {
            assert!(config.default_filter.contains(target));
        }
    }
}
