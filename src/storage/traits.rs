use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::error::StorageError;
use crate::session::ConversationId;

/// Reference to one file inside a conversation's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    conversation: ConversationId,
    path: PathBuf,
}

impl FileRef {
    #[must_use]
    pub fn new(conversation: ConversationId, path: PathBuf) -> Self {
        Self { conversation, path }
    }

    #[must_use]
    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Durable storage for staged images and rendered documents, namespaced per
/// conversation.
///
/// Implementations fail fast; the session pipelines never retry.
pub trait BlobStore: Send + Sync {
    /// Create the conversation's namespace. Idempotent.
    fn ensure_namespace<'a>(
        &'a self,
        conversation: ConversationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    /// Write `bytes` under a name derived from `suggested_name` that is unique
    /// within the namespace. The file is only visible under its final name
    /// once fully written.
    fn write_file<'a>(
        &'a self,
        conversation: ConversationId,
        suggested_name: &'a str,
        bytes: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<FileRef, StorageError>> + Send + 'a>>;

    fn read_all<'a>(
        &'a self,
        file: &'a FileRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, StorageError>> + Send + 'a>>;

    fn delete_file<'a>(
        &'a self,
        file: &'a FileRef,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    /// Files currently present in the conversation's namespace, sorted by name.
    fn list<'a>(
        &'a self,
        conversation: ConversationId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileRef>, StorageError>> + Send + 'a>>;
}
