use serde::Deserialize;
use telemetry_core::config::{load_from_dir, LoggingSettings, ServerSettings, TelemetrySettings};
use telemetry_core::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir()?;

    // Check if we're already in cloud-run-service directory or need to navigate to it
    let configuration_directory = if base_path.ends_with("cloud-run-service") {
        base_path.join("config")
    } else {
        base_path.join("cloud-run-service").join("config")
    };

    load_from_dir(&configuration_directory)
}
