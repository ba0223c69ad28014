use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::row_height::DisplayMode;

pub const DEFAULT_EXPORT_TABLE: &str = "results";

/// Character-metric sizing constants shared by the width engine, the
/// row-height estimator and the virtualizer. Units are pixels for the
/// desktop preset and terminal cells for [`GridMetrics::terminal`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridMetrics {
    pub char_width: f32,
    pub cell_padding: f32,
    pub min_column_width: f32,
    pub max_sample_width: f32,
    pub max_autofit_width: f32,
    pub sample_rows: usize,
    pub row_height: f32,
    pub line_height: f32,
    pub max_row_height: f32,
    pub overscan: usize,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.5,
            cell_padding: 24.0,
            min_column_width: 60.0,
            max_sample_width: 400.0,
            max_autofit_width: 800.0,
            sample_rows: 100,
            row_height: 28.0,
            line_height: 18.0,
            max_row_height: 300.0,
            overscan: 10,
        }
    }
}

impl GridMetrics {
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            char_width: 1.0,
            cell_padding: 2.0,
            min_column_width: 6.0,
            max_sample_width: 40.0,
            max_autofit_width: 120.0,
            sample_rows: 100,
            row_height: 1.0,
            line_height: 1.0,
            max_row_height: 8.0,
            overscan: 5,
        }
    }

    #[must_use]
    pub fn text_width(&self, chars: usize) -> f32 {
        chars as f32 * self.char_width + self.cell_padding
    }

    #[must_use]
    pub fn chars_per_line(&self, column_width: f32) -> usize {
        let usable = (column_width - self.cell_padding).max(0.0);
        let chars = (usable / self.char_width).floor();
        if chars.is_finite() && chars >= 1.0 {
            chars as usize
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportSettings {
    pub table_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_EXPORT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub metrics: GridMetrics,
    pub display: DisplayMode,
    pub export: ExportSettings,
}

impl GridConfig {
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            metrics: GridMetrics::terminal(),
            ..Self::default()
        }
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        Self::load_from_path(path)
    }

    /// A missing or blank file yields `base` unchanged.
    pub fn load_from_path_or(path: impl AsRef<Path>, base: Self) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(base);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(base);
        }

        let overrides: toml::Table = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut merged =
            toml::Value::try_from(&base).map_err(|source| ConfigError::Serialize { source })?;
        if let toml::Value::Table(table) = &mut merged {
            merge_tables(table, overrides);
        }

        merged.try_into().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_from_path_or(path, Self::default())
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read grid config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse grid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode grid config defaults: {source}")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base_dir = if let Some(custom) = env::var_os("GRIDLENS_CONFIG_DIR") {
        PathBuf::from(custom)
    } else if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("gridlens").join("grid.toml"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{GridConfig, GridMetrics};

    #[test]
    fn missing_config_file_loads_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = GridConfig::load_from_path(temp_dir.path().join("grid.toml"))
            .expect("missing file should load");
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("grid.toml");
        fs::write(
            &path,
            "[metrics]\nsample_rows = 25\n\n[display]\nwrap_text = true\n\n[export]\ntable_name = \"events\"\n",
        )
        .expect("failed to write config");

        let config = GridConfig::load_from_path(&path).expect("config should parse");
        assert_eq!(config.metrics.sample_rows, 25);
        assert!((config.metrics.char_width - 7.5).abs() < f32::EPSILON);
        assert!(config.display.wrap_text);
        assert!(!config.display.show_line_breaks);
        assert_eq!(config.export.table_name, "events");
    }

    #[test]
    fn terminal_base_survives_partial_overrides() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("grid.toml");
        fs::write(&path, "[metrics]\noverscan = 2\n").expect("failed to write config");

        let config = GridConfig::load_from_path_or(&path, GridConfig::terminal())
            .expect("config should parse");
        assert_eq!(config.metrics.overscan, 2);
        assert!((config.metrics.char_width - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_config_reports_parse_error() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("grid.toml");
        fs::write(&path, "[metrics\n").expect("failed to write config");

        let error = GridConfig::load_from_path(&path).expect_err("parse should fail");
        assert!(error.to_string().contains("failed to parse grid config"));
    }

    #[test]
    fn chars_per_line_subtracts_padding_and_never_hits_zero() {
        let metrics = GridMetrics::default();
        assert_eq!(metrics.chars_per_line(200.0), 23);
        assert_eq!(metrics.chars_per_line(10.0), 1);
    }
}
