use std::{fs, path::Path, path::PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("unknown timezone {0:?}")]
    Timezone(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    /// IANA zone in which "now" is taken when classifying shows.
    pub timezone: String,
    pub log_filter: String,
    pub seed_sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            database_path: utils::database_path(),
            timezone: "UTC".to_string(),
            log_filter: "fyyur=info,fyyur_lib=info,tower_http=info".to_string(),
            seed_sample_data: false,
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from the data directory, then applies `FYYUR_*`
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = read_config(&utils::config_path())?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.tz()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = read_config(path)?;
        config.tz()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FYYUR_BIND") {
            self.bind_addr = value;
        }
        if let Some(value) = lookup("FYYUR_DATABASE") {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("FYYUR_TIMEZONE") {
            self.timezone = value;
        }
        if let Some(value) = lookup("FYYUR_LOG") {
            self.log_filter = value;
        }
        if let Some(value) = lookup("FYYUR_SEED") {
            self.seed_sample_data = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "FYYUR_SEED",
                        value,
                    })
                }
            };
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
