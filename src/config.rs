use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::HubError;

pub const DEFAULT_CONFIG_FILE: &str = "trackhub-registry.json";
pub const SEARCH_URL_ENV: &str = "TRACKHUB_REGISTRY_SEARCH_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub database_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub database_path: Utf8PathBuf,
    pub search_url: String,
    pub search_index: String,
    pub http: HttpSettings,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `trackhub-registry.json` in the working directory
    /// when no path is given. A missing default file yields the defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HubError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| HubError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| HubError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(url) = std::env::var(SEARCH_URL_ENV) {
            if !url.trim().is_empty() {
                resolved.search_url = url.trim().to_string();
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HubError> {
        let database_path = match config.database_path {
            Some(path) => path,
            None => default_database_path()?,
        };
        let defaults = HttpSettings::default();

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            database_path,
            search_url: config
                .search
                .url
                .unwrap_or_else(|| "http://localhost:9200".to_string())
                .trim_end_matches('/')
                .to_string(),
            search_index: config.search.index.unwrap_or_else(|| "trackhubs".to_string()),
            http: HttpSettings {
                timeout_secs: config.http.timeout_secs.unwrap_or(defaults.timeout_secs),
                max_retries: config.http.max_retries.unwrap_or(defaults.max_retries),
            },
        })
    }
}

pub fn default_database_path() -> Result<Utf8PathBuf, HubError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.data_dir()
                    .join("trackhub-registry")
                    .join("registry.sqlite3"),
            )
            .ok()
        })
        .ok_or_else(|| HubError::Filesystem("unable to resolve data directory".to_string()))
}
