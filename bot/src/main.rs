use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use bot::config::{BotConfig, UpdateMode};
use bot::server::{self, AppState};
use bot::telegram::TelegramClient;
use bot::{Controller, Dispatcher};
use provider_core::ElevenLabsClient;
use session_core::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    tokio::select! {
        result = async_main() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting voice bot...");

    let config = BotConfig::from_env()?;
    info!(?config, "Configuration loaded");

    let provider = ElevenLabsClient::new(&config.elevenlabs_api_key, config.provider_config())
        .context("failed to build ElevenLabs client")?;
    let telegram = Arc::new(
        TelegramClient::new(
            &config.telegram_api_url,
            &config.bot_token,
            config.request_timeout(),
        )
        .context("failed to build Telegram client")?,
    );

    let sessions = Arc::new(SessionStore::new());
    let controller = Arc::new(Controller::new(
        sessions,
        telegram.clone(),
        Arc::new(provider),
    ));
    let dispatcher = Arc::new(Dispatcher::new(controller));

    match config.mode.clone() {
        UpdateMode::Polling => {
            server::run_polling(telegram, dispatcher, config.poll_timeout()).await
        }
        UpdateMode::Webhook { url, port } => {
            if config.webhook_secret.is_none() {
                warn!("WEBHOOK_SECRET not set, webhook accepts unauthenticated calls");
            }
            telegram
                .set_webhook(&url, config.webhook_secret.as_deref())
                .await
                .context("failed to register webhook")?;
            info!("Webhook registered at {url}");

            let state = AppState {
                dispatcher,
                webhook_secret: config.webhook_secret.clone(),
            };
            let app = server::router(state, config.request_timeout());

            let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
            let listener = TcpListener::bind(addr).await.map_err(|e| {
                anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
            })?;

            info!("Webhook server listening on http://{addr}");
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
