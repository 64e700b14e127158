use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::health::{ChannelHealthState, probe_channel};
use super::runtime::{ListenerBackoff, spawn_supervised_listener};
use super::telegram::TelegramChannel;
use super::traits::{Channel, InboundEvent};
use crate::config::{Config, TelegramConfig};
use crate::dispatch::{Dispatcher, spawn_session_reaper};
use crate::media::ImagePdfRenderer;
use crate::session::{SessionRegistry, SessionService};
use crate::storage::LocalBlobStore;

const EVENT_QUEUE_CAPACITY: usize = 100;
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_channel(telegram: &TelegramConfig) -> Arc<dyn Channel> {
    let allowed_users = telegram.allowed_users.clone();
    let channel = match telegram.api_base.as_deref().map(str::trim) {
        Some(base) if !base.is_empty() => {
            TelegramChannel::with_api_base(telegram.bot_token.clone(), allowed_users, base)
        }
        _ => TelegramChannel::new(telegram.bot_token.clone(), allowed_users),
    };
    Arc::new(channel)
}

pub async fn doctor(config: Arc<Config>) -> Result<()> {
    let channel = build_channel(config.require_telegram()?);

    println!("◆ Channel health");
    println!();

    let state = probe_channel(channel.as_ref(), HEALTH_CHECK_TIMEOUT).await;
    println!(
        "  {} {:<9} {}",
        state.marker(),
        channel.name(),
        state.describe()
    );

    println!();
    println!("  › storage: {}", config.storage_dir().display());
    println!(
        "  › max image size: {} bytes",
        config.storage.max_image_bytes
    );

    if state == ChannelHealthState::Healthy {
        Ok(())
    } else {
        anyhow::bail!("channel {} is not healthy", channel.name())
    }
}

/// Run the bot until Ctrl-C, then let in-flight conversations finish.
pub async fn start_bot(config: Arc<Config>) -> Result<()> {
    config.validate()?;
    let channel = build_channel(config.require_telegram()?);

    let storage_dir = config.storage_dir();
    tokio::fs::create_dir_all(&storage_dir)
        .await
        .with_context(|| format!("Failed to create storage directory {}", storage_dir.display()))?;
    let store = Arc::new(LocalBlobStore::new(&storage_dir));
    if config.storage.purge_on_start {
        let purged = store
            .purge_stale()
            .await
            .context("Failed to purge leftover session files")?;
        if purged > 0 {
            tracing::info!(purged, "removed files left by a previous run");
        }
    }

    let registry = Arc::new(SessionRegistry::new());
    let service = Arc::new(
        SessionService::new(
            Arc::clone(&registry),
            store,
            Arc::new(ImagePdfRenderer::new()),
            Arc::clone(&channel),
        )
        .configured(&config),
    );

    println!("◆ pdfbinder");
    println!("  › channel: {}", channel.name());
    println!("  › storage: {}", storage_dir.display());
    match service.idle_ttl() {
        Some(ttl) => println!("  › session expiry: {}s", ttl.as_secs()),
        None => println!("  › session expiry: off"),
    }
    println!();
    println!("  Listening... (Ctrl-C to stop)");
    println!();

    let (tx, rx) = tokio::sync::mpsc::channel::<InboundEvent>(EVENT_QUEUE_CAPACITY);
    let listener = spawn_supervised_listener(
        Arc::clone(&channel),
        tx.clone(),
        ListenerBackoff::from_reliability(&config.reliability),
    );
    let reaper = service.idle_ttl().map(|ttl| {
        spawn_session_reaper(
            Arc::clone(&registry),
            ttl,
            Duration::from_secs(config.sessions.sweep_interval_secs),
            tx.clone(),
        )
    });
    drop(tx);

    let lane_idle = Duration::from_secs(config.sessions.lane_idle_secs);
    let dispatcher = tokio::spawn(Dispatcher::new(service, lane_idle).run(rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested; finishing queued events");

    listener.abort();
    if let Some(reaper) = reaper {
        reaper.abort();
    }
    dispatcher.await.context("Dispatcher task failed")?;

    tracing::info!(pending_sessions = registry.len(), "stopped");
    Ok(())
}
