use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use axum::Router;
use obcheckout_connect::{
    config::Config,
    connect,
    gateway::PaymentGateway,
    secret::EnvSecretProvider,
    state::AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };
    let config = Config::from_env()?;
    let gateway = PaymentGateway::from_config(&config, Arc::new(EnvSecretProvider))?;
    let state = AppState::new(
        Arc::new(gateway),
        config.callback_parser(),
        config.poll_policy,
    );

    let app = Router::new()
        .merge(connect::api::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener =
        tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port))
            .await?;

    tracing::info!(callback = %config.callback_url, "Serving on port {}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
