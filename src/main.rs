use anyhow::Context;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mdprint::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .init();

    let settings = Settings::from_env();
    let bind_addr = settings.bind_addr();
    let addr = tokio::net::lookup_host(&bind_addr)
        .await
        .with_context(|| format!("cannot resolve bind address {bind_addr}"))?
        .next()
        .with_context(|| format!("no usable address for {bind_addr}"))?;

    let app = mdprint::router(settings);

    tracing::info!(%addr, "listening");
    axum::Server::try_bind(&addr)
        .with_context(|| format!("cannot bind {addr}"))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
