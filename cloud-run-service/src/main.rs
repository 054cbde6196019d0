use cloud_run_service::config::get_configuration;
use cloud_run_service::startup::build_router;
use dotenvy::dotenv;
use telemetry_core::observability::init_telemetry;
use telemetry_core::shutdown::shutdown_signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    // Change `telemetry.environment` to staging or production to export spans
    let _telemetry = init_telemetry(&configuration.telemetry, &configuration.logging)?;

    let app = build_router(configuration.telemetry.environment.clone());

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting cloud-run-service on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    Ok(())
}
