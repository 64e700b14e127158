use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::session::SessionRegistry;
use crate::transport::{EventKind, InboundEvent};

/// Periodically queue an expiry event for every session idle past `ttl`.
///
/// The expiry itself runs on the conversation's lane like any other event,
/// and is skipped there if the session saw activity in the meantime.
pub fn spawn_session_reaper(
    registry: Arc<SessionRegistry>,
    ttl: Duration,
    sweep_interval: Duration,
    tx: mpsc::Sender<InboundEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let expired = registry.expired(ttl);
            if !expired.is_empty() {
                tracing::debug!(sessions = expired.len(), "queueing idle sessions for expiry");
            }
            for conversation in expired {
                if tx
                    .send(InboundEvent::new(conversation, EventKind::Expire))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            if tx.is_closed() {
                return;
            }
        }
    })
}
