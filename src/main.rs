//! # Club Membership Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, wires the
//! lifecycle and campaign engines to the Telegram channel, starts the sweep
//! scheduler, and serves the health endpoints.

use anyhow::Result;
use std::sync::Arc;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use club_membership_bot::campaigns::{BroadcastDispatcher, CampaignEngine};
use club_membership_bot::channel::telegram::TelegramChannel;
use club_membership_bot::channel::NotificationChannel;
use club_membership_bot::config::Config;
use club_membership_bot::database::connection::DatabaseManager;
use club_membership_bot::services::health::HealthService;
use club_membership_bot::services::lifecycle::LifecycleEngine;
use club_membership_bot::services::sweeps::SweepService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "club_membership_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Club Membership Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Campaigns: {}",
        config.database_url, config.http_port, config.campaigns_dir
    );

    // Initialize database
    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db = Arc::new(db_manager);
    info!("Database initialized successfully");

    // The notification channel handle is injected into both engines at
    // construction; background jobs never reach it through globals.
    let bot = Bot::new(&config.telegram_bot_token);
    let channel: Arc<dyn NotificationChannel> =
        Arc::new(TelegramChannel::new(bot, config.community_chat_id));

    let lifecycle = Arc::new(LifecycleEngine::new(
        db.clone(),
        channel.clone(),
        config.payment_link.clone(),
        config.admin_chat_id,
    ));

    let dispatcher = BroadcastDispatcher::new(channel, db.clone());
    let campaigns = Arc::new(CampaignEngine::new(
        db.clone(),
        dispatcher,
        config.campaigns_dir.clone(),
    ));

    // Start the sweep scheduler
    info!("Initializing sweep service...");
    let mut sweep_service = match SweepService::new(lifecycle, campaigns).await {
        Ok(service) => {
            info!("Sweep service initialized successfully");
            service
        }
        Err(e) => {
            tracing::error!("Failed to create sweep service: {}", e);
            return Err(anyhow::anyhow!("Failed to create sweep service: {}", e));
        }
    };

    if let Err(e) = sweep_service.start().await {
        tracing::error!("Failed to start sweep service: {}", e);
    } else {
        info!("Sweep service started successfully");
    }

    // Initialize health service
    let health_service = HealthService::new(db);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    // Serve health checks until shutdown
    let server = async move { axum::serve(listener, health_service.router).await };
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Health server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    // Stop sweep service on shutdown
    if let Err(e) = sweep_service.stop().await {
        tracing::warn!("Error stopping sweep service: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
