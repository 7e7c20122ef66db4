use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field} in {config_path}: {reason}")]
    InvalidValue {
        config_path: PathBuf,
        field: &'static str,
        reason: String,
    },
}

/// Page and table geometry, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub indent_width: f32,
    pub cell_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 600.0,
            indent_width: 24.0,
            cell_padding: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

/// Text attributes applied beneath every fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub font: String,
    /// Point size
    pub size: f32,
    pub color: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            font: "sans-serif".to_string(),
            size: 12.0,
            color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub history: HistoryConfig,
    pub defaults: DefaultsConfig,
    pub logging: LoggingConfig,
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load the file at `config_path`; `~` and environment variables in the
    /// path are expanded. A missing file is `Ok(None)`.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = Self::expand_path(config_path.as_ref())
            .unwrap_or_else(|| config_path.as_ref().to_path_buf());
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.clone(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.clone(),
                source,
            })?;
        config.validate(&config_path)?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/docweave");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::InvalidValue {
            config_path: config_path.to_path_buf(),
            field,
            reason,
        };
        let positive = [
            ("layout.page_width", self.layout.page_width),
            ("defaults.size", self.defaults.size),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(invalid(field, format!("must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("layout.indent_width", self.layout.indent_width),
            ("layout.cell_padding", self.layout.cell_padding),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(invalid(field, format!("must not be negative, got {value}")));
            }
        }
        if self.history.max_depth == 0 {
            return Err(invalid("history.max_depth", "must be at least 1".to_string()));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(
                "logging.level",
                format!("unknown level {:?}", self.logging.level),
            ));
        }
        Ok(())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
