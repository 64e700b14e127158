use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::registry::SessionRegistry;
use super::replies;
use super::types::{ConversationId, RenderedDocument, Session};
use crate::config::{Config, StorageConfig};
use crate::error::{AssemblyError, IngestError, RenderError};
use crate::media::{PdfRenderer, classify_attachment, staged_image_name};
use crate::storage::{BlobStore, FileRef};
use crate::transport::{Channel, ImageAttachment};

const DEFAULT_DOCUMENT_NAME: &str = "images.pdf";

/// Result of a `/cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cleared { images: usize },
    NothingToClear,
}

/// Result of a reaper-triggered expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    Expired { images: usize },
    /// The session is gone or saw activity since the sweep.
    Skipped,
}

/// The ingest, generate, cancel and expire pipelines over one registry.
///
/// Callers must not run two pipelines for the same conversation concurrently;
/// the dispatcher guarantees this with per-conversation lanes.
pub struct SessionService {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn BlobStore>,
    renderer: Arc<dyn PdfRenderer>,
    channel: Arc<dyn Channel>,
    max_image_bytes: u64,
    document_name: String,
    idle_ttl: Option<Duration>,
}

impl SessionService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn BlobStore>,
        renderer: Arc<dyn PdfRenderer>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            registry,
            store,
            renderer,
            channel,
            max_image_bytes: StorageConfig::default().max_image_bytes,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            idle_ttl: None,
        }
    }

    /// Apply the size limit, document name and idle TTL from `config`.
    pub fn configured(mut self, config: &Config) -> Self {
        self.max_image_bytes = config.storage.max_image_bytes;
        self.document_name.clone_from(&config.sessions.document_name);
        self.idle_ttl = match config.sessions.idle_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        self
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn with_document_name(mut self, document_name: impl Into<String>) -> Self {
        self.document_name = document_name.into();
        self
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Option<Duration>) -> Self {
        self.idle_ttl = idle_ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Validate, stage and register one image. Returns the session's image
    /// count. Any error leaves the registry and the blob store untouched.
    pub async fn ingest(
        &self,
        conversation: ConversationId,
        attachment: &ImageAttachment,
    ) -> Result<usize, IngestError> {
        if !classify_attachment(&attachment.kind).is_image() {
            return Err(IngestError::NotAnImage);
        }
        if let Some(size) = attachment.declared_size {
            self.check_size(size)?;
        }

        let bytes = self
            .channel
            .fetch_media(&attachment.data)
            .await
            .map_err(IngestError::Download)?;
        self.check_size(bytes.len() as u64)?;

        self.store
            .ensure_namespace(conversation)
            .await
            .map_err(IngestError::Staging)?;
        let name = staged_image_name(&bytes, Utc::now());
        let file = self
            .store
            .write_file(conversation, &name, &bytes)
            .await
            .map_err(IngestError::Staging)?;

        let count = self.registry.append_image(conversation, file);
        tracing::debug!(conversation = %conversation, image_count = count, "image staged");

        self.report_count(conversation, count).await;
        Ok(count)
    }

    fn check_size(&self, size: u64) -> Result<(), IngestError> {
        if size > self.max_image_bytes {
            return Err(IngestError::TooLarge {
                size,
                limit: self.max_image_bytes,
            });
        }
        Ok(())
    }

    /// Post or update the status message. Never fails: an edit that is
    /// rejected falls back to a fresh message, which becomes the new target.
    async fn report_count(&self, conversation: ConversationId, count: usize) {
        let text = if count == 1 {
            replies::FIRST_IMAGE.to_string()
        } else {
            replies::image_count(count)
        };

        if count > 1
            && let Some(status) = self.registry.status_message(conversation)
        {
            match self.channel.edit_text(&status, &text).await {
                Ok(()) => return,
                Err(error) => tracing::warn!(
                    conversation = %conversation,
                    error = %format!("{error:#}"),
                    "status edit failed; sending a new message"
                ),
            }
        }

        match self.channel.send_text(conversation, &text).await {
            Ok(message) => {
                self.registry.set_status_message(conversation, message);
            }
            Err(error) => tracing::warn!(
                conversation = %conversation,
                error = %format!("{error:#}"),
                "failed to send status message"
            ),
        }
    }

    // ── Assembly ─────────────────────────────────────────────────────────

    /// Render the session into one PDF, deliver it and retire the session.
    /// Returns the page count.
    ///
    /// On any failure the session stays registered with all of its images.
    /// A document that was rendered but not delivered is kept and re-sent by
    /// the next attempt unless more images arrived in between.
    pub async fn generate(&self, conversation: ConversationId) -> Result<usize, AssemblyError> {
        let session = self
            .registry
            .get(conversation)
            .filter(|session| session.image_count() > 0)
            .ok_or(AssemblyError::NothingToGenerate)?;
        let page_count = session.image_count();

        let pdf = match self.reusable_document(&session).await {
            Some(pdf) => pdf,
            None => self.render_and_stage(&session).await?,
        };

        self.channel
            .send_document(conversation, pdf, &self.document_name)
            .await
            .map_err(AssemblyError::Delivery)?;

        if let Some(session) = self.registry.remove(conversation) {
            self.delete_files(conversation, &session.owned_files()).await;
        }
        tracing::info!(conversation = %conversation, page_count, "document delivered");
        Ok(page_count)
    }

    /// Bytes of a previously rendered document that still matches the
    /// session. A stale or unreadable document is deleted and forgotten.
    async fn reusable_document(&self, session: &Session) -> Option<Vec<u8>> {
        let rendered = session.rendered.as_ref()?;
        let conversation = session.conversation;

        if rendered.page_count == session.image_count() {
            match self.store.read_all(&rendered.file).await {
                Ok(pdf) => {
                    tracing::debug!(conversation = %conversation, "re-sending rendered document");
                    return Some(pdf);
                }
                Err(error) => tracing::warn!(
                    conversation = %conversation,
                    %error,
                    "rendered document unreadable; rendering again"
                ),
            }
        }

        self.registry.set_rendered(conversation, None);
        self.delete_files(conversation, std::slice::from_ref(&rendered.file))
            .await;
        None
    }

    async fn render_and_stage(&self, session: &Session) -> Result<Vec<u8>, AssemblyError> {
        let conversation = session.conversation;

        let mut images = Vec::with_capacity(session.image_count());
        for file in session.images() {
            images.push(
                self.store
                    .read_all(file)
                    .await
                    .map_err(AssemblyError::Load)?,
            );
        }

        let renderer = Arc::clone(&self.renderer);
        let pdf = tokio::task::spawn_blocking(move || renderer.render(&images))
            .await
            .map_err(|e| AssemblyError::Conversion(RenderError::Aborted(e.to_string())))?
            .map_err(AssemblyError::Conversion)?;

        let file = self
            .store
            .write_file(conversation, &self.document_name, &pdf)
            .await
            .map_err(AssemblyError::Staging)?;
        self.registry.set_rendered(
            conversation,
            Some(RenderedDocument {
                file,
                page_count: session.image_count(),
            }),
        );
        Ok(pdf)
    }

    // ── Cancel / expiry ──────────────────────────────────────────────────

    /// Drop the session and its files. Safe to call repeatedly.
    pub async fn cancel(&self, conversation: ConversationId) -> CancelOutcome {
        let Some(session) = self.registry.remove(conversation) else {
            return CancelOutcome::NothingToClear;
        };
        let images = session.image_count();
        self.delete_files(conversation, &session.owned_files()).await;
        tracing::info!(conversation = %conversation, image_count = images, "session cleared");
        CancelOutcome::Cleared { images }
    }

    /// Cancel the session if it is still idle past the TTL.
    pub async fn expire(&self, conversation: ConversationId) -> ExpireOutcome {
        let Some(ttl) = self.idle_ttl else {
            return ExpireOutcome::Skipped;
        };
        let idle = self
            .registry
            .get(conversation)
            .is_some_and(|session| session.last_activity.elapsed() >= ttl);
        if !idle {
            return ExpireOutcome::Skipped;
        }

        match self.cancel(conversation).await {
            CancelOutcome::Cleared { images } => {
                tracing::info!(conversation = %conversation, "idle session expired");
                ExpireOutcome::Expired { images }
            }
            CancelOutcome::NothingToClear => ExpireOutcome::Skipped,
        }
    }

    /// Best effort: each file is attempted, failures are only logged.
    async fn delete_files(&self, conversation: ConversationId, files: &[FileRef]) {
        for file in files {
            if let Err(error) = self.store.delete_file(file).await {
                tracing::warn!(
                    conversation = %conversation,
                    file = %file.name(),
                    %error,
                    "failed to delete staged file"
                );
            }
        }
    }
}
