use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boardwalk::AppState;
use boardwalk::handlers;
use boardwalk_api::ThingsBoardClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boardwalk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = boardwalk_config::load_config().context("failed to load configuration")?;

    let base_url = config.resolve_base_url();
    match &base_url {
        Some(url) => tracing::info!("forwarding to ThingsBoard at {url}"),
        None => tracing::warn!("no upstream base URL configured; upstream endpoints will fail"),
    }

    let client = ThingsBoardClient::new(
        base_url,
        config.resolve_api_token(),
        &config.to_transport_config(),
    )
    .context("failed to build upstream client")?;

    let state = AppState::new(client);
    let app = handlers::router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
