use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::ReliabilityConfig;
use crate::transport::traits::{Channel, InboundEvent};

/// Restart delay for a failing listener: doubles per failure up to `max`,
/// and resets after a clean exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ListenerBackoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_secs(1));
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub(crate) fn from_reliability(reliability: &ReliabilityConfig) -> Self {
        Self::new(
            Duration::from_secs(reliability.channel_initial_backoff_secs),
            Duration::from_secs(reliability.channel_max_backoff_secs),
        )
    }

    /// Delay to wait now; the following call returns double, capped.
    fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Keep the channel listening until the event receiver goes away.
pub(crate) fn spawn_supervised_listener(
    channel: Arc<dyn Channel>,
    tx: mpsc::Sender<InboundEvent>,
    mut backoff: ListenerBackoff,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let name = channel.name().to_string();
        loop {
            tracing::debug!(channel = %name, "listener starting");
            let outcome = channel.listen(tx.clone()).await;
            if tx.is_closed() {
                tracing::debug!(channel = %name, "event queue closed; listener stopped");
                return;
            }

            if let Err(error) = outcome {
                tracing::error!(channel = %name, "listener failed: {error:#}");
            } else {
                tracing::warn!(channel = %name, "listener returned; restarting");
                backoff.reset();
            }
            tokio::time::sleep(backoff.advance()).await;
        }
    })
}
