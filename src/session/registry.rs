use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::types::{ConversationId, RenderedDocument, Session};
use crate::storage::FileRef;
use crate::transport::MessageRef;

/// In-memory map from conversation to its pending session.
///
/// A session only ever comes into existence through [`append_image`], so a
/// registered session always holds at least one staged image. Every method
/// takes the map lock once; read-modify-write sequences spanning several
/// calls rely on the dispatcher running one event per conversation at a time.
///
/// [`append_image`]: SessionRegistry::append_image
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConversationId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of the conversation's session.
    pub fn get(&self, conversation: ConversationId) -> Option<Session> {
        self.lock().get(&conversation).cloned()
    }

    pub fn contains(&self, conversation: ConversationId) -> bool {
        self.lock().contains_key(&conversation)
    }

    /// Append a staged image, creating the session on first use. Returns the
    /// image count after the append.
    pub fn append_image(&self, conversation: ConversationId, file: FileRef) -> usize {
        let mut sessions = self.lock();
        let session = sessions.entry(conversation).or_insert_with(|| {
            tracing::info!(conversation = %conversation, "session created");
            Session::new(conversation)
        });
        session.push_image(file)
    }

    /// Remember the status message to edit on the next image. Returns `false`
    /// when the session is gone.
    pub fn set_status_message(&self, conversation: ConversationId, message: MessageRef) -> bool {
        self.update(conversation, |session| session.status_message = Some(message))
    }

    pub fn status_message(&self, conversation: ConversationId) -> Option<MessageRef> {
        self.lock()
            .get(&conversation)
            .and_then(|session| session.status_message)
    }

    /// Attach (or clear) the rendered document kept for a delivery retry.
    pub fn set_rendered(
        &self,
        conversation: ConversationId,
        rendered: Option<RenderedDocument>,
    ) -> bool {
        self.update(conversation, |session| session.rendered = rendered)
    }

    /// Remove and return the session. Removing an absent key is a no-op.
    pub fn remove(&self, conversation: ConversationId) -> Option<Session> {
        self.lock().remove(&conversation)
    }

    /// Conversations whose session has been idle for at least `ttl`.
    pub fn expired(&self, ttl: Duration) -> Vec<ConversationId> {
        self.expired_at(Instant::now(), ttl)
    }

    pub(crate) fn expired_at(&self, now: Instant, ttl: Duration) -> Vec<ConversationId> {
        let mut expired: Vec<_> = self
            .lock()
            .values()
            .filter(|session| now.saturating_duration_since(session.last_activity) >= ttl)
            .map(|session| session.conversation)
            .collect();
        expired.sort_unstable();
        expired
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn update(&self, conversation: ConversationId, f: impl FnOnce(&mut Session)) -> bool {
        match self.lock().get_mut(&conversation) {
            Some(session) => {
                f(session);
                session.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }
}
