use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handler::{handle_event, send_reply};
use crate::session::{ConversationId, SessionService, replies};
use crate::transport::InboundEvent;

struct Lane {
    tx: mpsc::UnboundedSender<InboundEvent>,
    handle: JoinHandle<()>,
}

/// Fans inbound events out to one ordered lane per conversation.
///
/// A lane is a task draining an unbounded queue. It retires after
/// `lane_idle` without events; an event racing with the retirement starts a
/// successor lane that waits for its predecessor to finish first, so per
/// conversation order survives lane turnover.
pub struct Dispatcher {
    service: Arc<SessionService>,
    lane_idle: Duration,
    lanes: HashMap<ConversationId, Lane>,
}

impl Dispatcher {
    pub fn new(service: Arc<SessionService>, lane_idle: Duration) -> Self {
        Self {
            service,
            lane_idle: lane_idle.max(Duration::from_millis(1)),
            lanes: HashMap::new(),
        }
    }

    /// Consume events until every sender is dropped, then drain the lanes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        tracing::info!("event stream closed; draining conversation lanes");
        self.shutdown().await;
    }

    pub fn dispatch(&mut self, event: InboundEvent) {
        self.lanes.retain(|_, lane| !lane.handle.is_finished());

        let conversation = event.conversation;
        let event = match self.lanes.get(&conversation) {
            Some(lane) => match lane.tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let predecessor = self.lanes.remove(&conversation).map(|lane| lane.handle);
        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(event).is_err() {
            return;
        }
        let handle = tokio::spawn(run_lane(
            Arc::clone(&self.service),
            conversation,
            rx,
            predecessor,
            self.lane_idle,
        ));
        tracing::debug!(conversation = %conversation, "lane started");
        self.lanes.insert(conversation, Lane { tx, handle });
    }

    /// Lanes that have not retired yet.
    pub fn active_lanes(&self) -> usize {
        self.lanes
            .values()
            .filter(|lane| !lane.handle.is_finished())
            .count()
    }

    /// Stop accepting events and wait for every queued event to finish.
    pub async fn shutdown(mut self) {
        for (conversation, lane) in self.lanes.drain() {
            drop(lane.tx);
            if let Err(error) = lane.handle.await {
                tracing::error!(conversation = %conversation, %error, "lane ended abnormally");
            }
        }
    }
}

async fn run_lane(
    service: Arc<SessionService>,
    conversation: ConversationId,
    mut rx: mpsc::UnboundedReceiver<InboundEvent>,
    predecessor: Option<JoinHandle<()>>,
    lane_idle: Duration,
) {
    if let Some(predecessor) = predecessor {
        let _ = predecessor.await;
    }

    loop {
        match tokio::time::timeout(lane_idle, rx.recv()).await {
            Ok(Some(event)) => process(&service, event).await,
            Ok(None) => break,
            Err(_) => {
                // Refuse new events, then finish whatever was already queued.
                rx.close();
                while let Some(event) = rx.recv().await {
                    process(&service, event).await;
                }
                break;
            }
        }
    }
    tracing::debug!(conversation = %conversation, "lane retired");
}

/// Run one event on its own task so a panic stays contained to that event.
async fn process(service: &Arc<SessionService>, event: InboundEvent) {
    let conversation = event.conversation;
    let event_id = event.id.clone();
    let task_service = Arc::clone(service);

    let result = tokio::spawn(async move { handle_event(&task_service, event).await }).await;

    if let Err(error) = result {
        tracing::error!(
            conversation = %conversation,
            event_id = %event_id,
            %error,
            "event handler crashed"
        );
        if error.is_panic() {
            send_reply(
                service.channel().as_ref(),
                conversation,
                replies::INTERNAL_FAILURE,
            )
            .await;
        }
    }
}
