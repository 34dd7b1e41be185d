use gateflow_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gateflow_observability::init();

    let config = AppConfig::from_env()?;
    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let app = gateflow_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
