use std::fmt;
use std::time::Instant;

use crate::storage::FileRef;
use crate::transport::MessageRef;

/// Stable key of one conversation (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(i64);

impl ConversationId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document rendered for a session but not yet confirmed delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file: FileRef,
    /// Number of leading session images the document was rendered from.
    pub page_count: usize,
}

/// Images collected for one conversation, pending assembly or cancellation.
///
/// `images` is append-only: insertion order is page order.
#[derive(Debug, Clone)]
pub struct Session {
    pub conversation: ConversationId,
    images: Vec<FileRef>,
    pub status_message: Option<MessageRef>,
    pub rendered: Option<RenderedDocument>,
    pub last_activity: Instant,
}

impl Session {
    pub(crate) fn new(conversation: ConversationId) -> Self {
        Self {
            conversation,
            images: Vec::new(),
            status_message: None,
            rendered: None,
            last_activity: Instant::now(),
        }
    }

    #[must_use]
    pub fn images(&self) -> &[FileRef] {
        &self.images
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Appends a staged image and returns the new image count.
    pub(crate) fn push_image(&mut self, file: FileRef) -> usize {
        self.images.push(file);
        self.last_activity = Instant::now();
        self.images.len()
    }

    /// Every file this session owns in the blob store, images first.
    #[must_use]
    pub fn owned_files(&self) -> Vec<FileRef> {
        let mut files = self.images.clone();
        if let Some(rendered) = &self.rendered {
            files.push(rendered.file.clone());
        }
        files
    }
}
