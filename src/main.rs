mod bot;
mod codec;
mod config;
mod relay;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::requests::Requester;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Support chat: {}", config.support_chat_id);
    info!("  Bind address: {}", config.bind_addr);

    let state = Arc::new(AppState::new(config));

    if let Some(public_url) = state.config.public_url.clone() {
        register_webhook(&state, &public_url).await?;
    }

    let app = server::router(state.clone());

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", state.config.bind_addr))?;

    info!("Webhook server listening on {}", state.config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Register `<public_url>/webhook` with Telegram, passing the shared secret
/// it must echo back on every delivery.
async fn register_webhook(state: &AppState, public_url: &str) -> Result<()> {
    let webhook_url = format!("{public_url}/webhook");
    let url = webhook_url
        .parse::<url::Url>()
        .with_context(|| format!("Invalid webhook URL: {webhook_url}"))?;

    let mut req = state.bot.set_webhook(url);
    req.secret_token = Some(state.config.webhook_secret.clone());
    req.await
        .context("Failed to register webhook with Telegram")?;

    info!("Webhook registered: {webhook_url}");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
