use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Deployment environment a process runs in.
///
/// Drives both the serialization fallback policy of the event emitter and
/// whether spans are exported at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Other(Arc<str>),
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Other(name) => name,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => Environment::Other(Arc::from(other)),
        }
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Environment::from(value.as_str())
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    /// Reported as `service.name` on every exported span.
    pub service_name: String,
    pub environment: Environment,
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    /// Environments in which spans are exported. Anywhere else span creation
    /// stays local and no exporter is ever built.
    #[serde(default = "default_export_environments")]
    pub export_environments: Vec<Environment>,
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_export_environments() -> Vec<Environment> {
    vec![Environment::Staging, Environment::Production]
}

impl TelemetrySettings {
    pub fn exports_spans(&self) -> bool {
        self.export_environments.contains(&self.environment)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Output format of the log sink, loaded from the `logging` section of the
/// service configuration document.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub with_file: bool,
    #[serde(default = "default_true")]
    pub with_line_number: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            with_file: true,
            with_line_number: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Loads `base.yaml` from `configuration_directory`, then applies `APP_`
/// prefixed environment overrides (`APP_TELEMETRY__ENVIRONMENT=production`).
pub fn load_from_dir<T>(configuration_directory: &Path) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
