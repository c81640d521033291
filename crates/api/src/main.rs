use anyhow::Context;

use drillstore_api::app::{self, services::AppServices};
use drillstore_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    drillstore_observability::init();

    let config = AppConfig::load().context("failed to load configuration")?;
    if config.jwt_secret == AppConfig::default().jwt_secret {
        tracing::warn!("DRILLSTORE_JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize material store backend")?;
    tracing::info!(backend = services.backend_name(), "material store backend ready");

    let app = app::build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
