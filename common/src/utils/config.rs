use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,
    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,
    /// Directory shared with the enrichment workers, holding `<hash>-original.txt` files.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
    #[serde(default)]
    pub frontend_dir: Option<String>,
    #[serde(default = "default_legacy_converter_bin")]
    pub legacy_converter_bin: String,
    #[serde(default = "default_conversion_timeout_secs")]
    pub conversion_timeout_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_broker_timeout_secs")]
    pub broker_timeout_secs: u64,
    #[serde(default = "default_broker_connect_timeout_secs")]
    pub broker_connect_timeout_secs: u64,
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: usize,
}

fn default_http_port() -> u16 {
    8082
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_client_id() -> String {
    "backend-client".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    5
}

fn default_artifacts_dir() -> String {
    "./original".to_string()
}

fn default_legacy_converter_bin() -> String {
    "soffice".to_string()
}

fn default_conversion_timeout_secs() -> u64 {
    60
}

fn default_store_timeout_secs() -> u64 {
    5
}

fn default_broker_timeout_secs() -> u64 {
    5
}

fn default_broker_connect_timeout_secs() -> u64 {
    10
}

fn default_upload_max_bytes() -> usize {
    10 << 20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "articles".to_string(),
            surrealdb_database: "articles".to_string(),
            http_port: default_http_port(),
            mqtt_host: default_mqtt_host(),
            mqtt_port: default_mqtt_port(),
            mqtt_client_id: default_mqtt_client_id(),
            mqtt_keep_alive_secs: default_mqtt_keep_alive_secs(),
            artifacts_dir: default_artifacts_dir(),
            frontend_dir: None,
            legacy_converter_bin: default_legacy_converter_bin(),
            conversion_timeout_secs: default_conversion_timeout_secs(),
            store_timeout_secs: default_store_timeout_secs(),
            broker_timeout_secs: default_broker_timeout_secs(),
            broker_connect_timeout_secs: default_broker_connect_timeout_secs(),
            upload_max_bytes: default_upload_max_bytes(),
        }
    }
}

impl AppConfig {
    pub fn artifacts_path(&self) -> PathBuf {
        PathBuf::from(&self.artifacts_dir)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn broker_timeout(&self) -> Duration {
        Duration::from_secs(self.broker_timeout_secs)
    }

    pub fn broker_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.broker_connect_timeout_secs)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
