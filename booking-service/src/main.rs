use booking_service::{config::BookingConfig, services::init_metrics, Application};
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration - fail fast if invalid
    let config = BookingConfig::load()?;

    init_tracing(
        "booking-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        organization = %config.business.org_name,
        "Starting booking service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
