use std::future::Future;
use std::pin::Pin;

use crate::session::ConversationId;

/// Addressable reference to a message the bot sent, used for in-place edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub conversation: ConversationId,
    pub message_id: i64,
}

/// Where the bytes of an inbound attachment live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaData {
    /// Already in memory.
    Bytes(Vec<u8>),
    /// Held by the transport; fetch with [`Channel::fetch_media`].
    Remote(String),
}

/// How the attachment was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    Photo,
    Document { mime_type: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub kind: AttachmentKind,
    pub data: MediaData,
    /// Size announced by the transport before any download.
    pub declared_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Generate,
    Cancel,
}

impl Command {
    /// Parses `/name` or `/name@bot_username`, ignoring trailing arguments.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _)| name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "generate" => Some(Self::Generate),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Attachment(ImageAttachment),
    Command(Command),
    /// Raised by the session reaper, never by a transport.
    Expire,
}

/// An inbound event, pre-classified and tagged with its conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub id: String,
    pub conversation: ConversationId,
    pub kind: EventKind,
    pub timestamp: u64,
}

impl InboundEvent {
    #[must_use]
    pub fn new(conversation: ConversationId, kind: EventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation,
            kind,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Messaging transport: produces inbound events and carries status messages
/// and documents back to the user.
pub trait Channel: Send + Sync {
    /// Human-readable channel name
    fn name(&self) -> &str;

    /// Start listening for incoming events (long-running)
    fn listen<'a>(
        &'a self,
        tx: tokio::sync::mpsc::Sender<InboundEvent>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Send a text message and return its reference.
    fn send_text<'a>(
        &'a self,
        conversation: ConversationId,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MessageRef>> + Send + 'a>>;

    /// Replace the text of a previously sent message. Fails when the message
    /// is gone or no longer editable.
    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Deliver a file as a downloadable document.
    fn send_document<'a>(
        &'a self,
        conversation: ConversationId,
        bytes: Vec<u8>,
        display_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Resolve attachment bytes.
    fn fetch_media<'a>(
        &'a self,
        data: &'a MediaData,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            match data {
                MediaData::Bytes(bytes) => Ok(bytes.clone()),
                MediaData::Remote(id) => {
                    anyhow::bail!("channel {} cannot fetch remote media {id}", self.name())
                }
            }
        })
    }

    /// Check if channel is healthy
    fn health_check<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move { true })
    }
}
