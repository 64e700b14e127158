use std::time::Duration;

use super::traits::Channel;

/// Outcome of probing a channel's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelHealthState {
    Healthy,
    Unhealthy,
    Timeout,
}

impl ChannelHealthState {
    pub(crate) fn from_probe(result: Result<bool, tokio::time::error::Elapsed>) -> Self {
        match result {
            Ok(true) => Self::Healthy,
            Ok(false) => Self::Unhealthy,
            Err(_) => Self::Timeout,
        }
    }

    pub(crate) fn marker(self) -> char {
        match self {
            Self::Healthy => '✓',
            Self::Unhealthy => '✗',
            Self::Timeout => '!',
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy (check bot_token and network)",
            Self::Timeout => "timed out",
        }
    }
}

/// Run the channel's health check, giving up after `timeout`.
pub(crate) async fn probe_channel(channel: &dyn Channel, timeout: Duration) -> ChannelHealthState {
    ChannelHealthState::from_probe(tokio::time::timeout(timeout, channel.health_check()).await)
}
