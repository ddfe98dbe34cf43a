use hiring_funnel::api::{ApiServer, ApiServerConfig, AppState};
use hiring_funnel::config::AppConfig;
use hiring_funnel::logging::init_logging;
use hiring_funnel::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let (logging_config, _log_guard) = init_logging(&config.log_dir)?;

    let services = ServiceContainer::new(config).await?;
    logging_config.start_retention_cleanup(services.cancellation_token());
    services.initialize().await?;

    let state = AppState::from_services(&services).with_logging_config(logging_config);
    let server = ApiServer::with_state(ApiServerConfig::from(&services.config), state);

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        cancel.cancel();
    });

    server.run().await?;
    services.shutdown().await;

    tracing::info!("hiring-funnel stopped");
    Ok(())
}
