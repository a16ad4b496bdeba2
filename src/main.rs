mod config;
mod gateway;
mod handlers;
mod relay;
mod router;
mod scheduler;
mod server;
mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::gateway::{GatewayClient, NoopEventSource, NoopGateway};
use crate::relay::WebhookRelay;
use crate::router::Router;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pontobot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Gateway token configured: {}", !config.discord.bot_token.is_empty());
    info!("  Registration channel: {}", config.discord.registration_channel_id);
    info!("  Registration webhook: {}", config.webhooks.registration_url);
    info!("  Points webhook: {}", config.webhooks.points_url);

    // The webhook client is built before the first inbound event, so no
    // handler can ever observe a half-initialized transport.
    let relay = Arc::new(WebhookRelay::new(
        config.webhooks.effective_auth_token().map(str::to_string),
    ));

    // Platform connection seam: the concrete client (transport, auth
    // handshake, component rendering) plugs in here.
    let gateway: Arc<dyn GatewayClient> = Arc::new(NoopGateway);
    let events = Arc::new(NoopEventSource);

    post_panels(&config, gateway.as_ref()).await;

    let _rank_task = match config.rank_target() {
        Some((channel_id, rank_url)) => Some(scheduler::spawn_daily_rank(
            gateway.clone(),
            relay.clone(),
            rank_url.to_string(),
            channel_id.to_string(),
        )),
        None => {
            warn!("Rank channel or webhook not configured; daily rank disabled");
            None
        }
    };

    // Liveness endpoint
    let http = config.http.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run(http.port, http.invite_url).await {
            error!("Liveness endpoint failed: {:#}", e);
        }
    });

    let router = Arc::new(Router::new(gateway, relay, config.webhooks.clone()));

    info!("Bot is starting...");
    router::run(router, events).await
}

/// Post the announcement panels to their configured channels. Failures are
/// logged and non-fatal; the bot still serves interactions from panels
/// posted earlier.
async fn post_panels(config: &Config, gateway: &dyn GatewayClient) {
    match gateway
        .send_to_channel(
            &config.discord.registration_channel_id,
            handlers::register::registration_panel(),
        )
        .await
    {
        Ok(()) => info!("Registration message sent"),
        Err(e) => error!("Failed to send registration message: {}", e),
    }

    if let Some(channel_id) = &config.discord.consult_channel_id {
        match gateway
            .send_to_channel(channel_id, handlers::points::consult_panel())
            .await
        {
            Ok(()) => info!("Points consultation message sent"),
            Err(e) => error!("Failed to send points consultation message: {}", e),
        }
    }

    if let Some(channel_id) = &config.discord.manage_channel_id {
        match gateway
            .send_to_channel(channel_id, handlers::points::manage_panel())
            .await
        {
            Ok(()) => info!("Points management message sent"),
            Err(e) => error!("Failed to send points management message: {}", e),
        }
    }
}
