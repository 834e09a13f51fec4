use std::path::PathBuf;

use common::config::{ApiConfig, ChannelConfig, ClientConfig, HttpConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Terminal client configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Defaults, then the optional config file (`CODEVERSE_CONFIG`, default
    /// `config/config`), then `CODEVERSE__SECTION__KEY` variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("CODEVERSE_CONFIG").ok())
            .unwrap_or_else(|| "config/config".to_string());

        let s = Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("CODEVERSE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn client(&self) -> ClientConfig {
        ClientConfig {
            api: self.api.clone(),
            http: self.http.clone(),
            channel: self.channel.clone(),
            storage: self.storage.clone(),
        }
    }

    /// Where the session store lives. Default: `<config dir>/codeverse/store.json`.
    pub fn store_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("codeverse")
                .join("store.json"),
        }
    }
}
