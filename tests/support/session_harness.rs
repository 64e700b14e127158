#![allow(dead_code)]

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use pdfbinder::media::{ImagePdfRenderer, PdfRenderer};
use pdfbinder::session::{ConversationId, SessionRegistry, SessionService};
use pdfbinder::storage::{BlobStore, FileRef, LocalBlobStore};
use pdfbinder::transport::{
    AttachmentKind, Channel, ImageAttachment, InboundEvent, MediaData, MessageRef,
};

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub conversation: ConversationId,
    pub bytes: Vec<u8>,
    pub display_name: String,
}

/// In-memory channel that records everything the bot sends.
#[derive(Default)]
pub struct RecordingChannel {
    texts: Mutex<Vec<(ConversationId, String)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    documents: Mutex<Vec<SentDocument>>,
    next_message_id: AtomicI64,
    pub fail_edits: AtomicBool,
    pub fail_documents: AtomicBool,
}

impl RecordingChannel {
    pub fn texts(&self, conversation: ConversationId) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == conversation)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last_text(&self, conversation: ConversationId) -> Option<String> {
        self.texts(conversation).pop()
    }

    pub fn edits(&self, conversation: ConversationId) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.conversation == conversation)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn documents(&self) -> Vec<SentDocument> {
        self.documents.lock().unwrap().clone()
    }

    pub fn set_fail_documents(&self, fail: bool) {
        self.fail_documents.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }
}

impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn listen<'a>(
        &'a self,
        _tx: mpsc::Sender<InboundEvent>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move { Ok(()) })
    }

    fn send_text<'a>(
        &'a self,
        conversation: ConversationId,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MessageRef>> + Send + 'a>> {
        Box::pin(async move {
            self.texts
                .lock()
                .unwrap()
                .push((conversation, text.to_string()));
            Ok(MessageRef {
                conversation,
                message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
            })
        })
    }

    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_edits.load(Ordering::SeqCst) {
                anyhow::bail!("Bad Request: message can't be edited");
            }
            self.edits.lock().unwrap().push((*message, text.to_string()));
            Ok(())
        })
    }

    fn send_document<'a>(
        &'a self,
        conversation: ConversationId,
        bytes: Vec<u8>,
        display_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_documents.load(Ordering::SeqCst) {
                anyhow::bail!("Too Many Requests: retry later");
            }
            self.documents.lock().unwrap().push(SentDocument {
                conversation,
                bytes,
                display_name: display_name.to_string(),
            });
            Ok(())
        })
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<LocalBlobStore>,
    pub channel: Arc<RecordingChannel>,
    pub registry: Arc<SessionRegistry>,
    pub service: Arc<SessionService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(ImagePdfRenderer::new()))
    }

    pub fn with_renderer(renderer: Arc<dyn PdfRenderer>) -> Self {
        Self::build(renderer, None)
    }

    pub fn with_idle_ttl(ttl: Duration) -> Self {
        Self::build(Arc::new(ImagePdfRenderer::new()), Some(ttl))
    }

    fn build(renderer: Arc<dyn PdfRenderer>, idle_ttl: Option<Duration>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalBlobStore::new(dir.path().join("temp")));
        let channel = Arc::new(RecordingChannel::default());
        let registry = Arc::new(SessionRegistry::new());
        let service = Arc::new(SessionService::new(
            Arc::clone(&registry),
            Arc::clone(&store) as Arc<dyn BlobStore>,
            renderer,
            Arc::clone(&channel) as Arc<dyn Channel>,
        )
        .with_idle_ttl(idle_ttl));
        Self {
            dir,
            store,
            channel,
            registry,
            service,
        }
    }

    pub async fn stored_files(&self, conversation: ConversationId) -> Vec<FileRef> {
        self.store.list(conversation).await.unwrap()
    }

    /// Contents of the session's images, in session order.
    pub async fn session_contents(&self, conversation: ConversationId) -> Vec<Vec<u8>> {
        let session = self.registry.get(conversation).unwrap();
        let mut contents = Vec::new();
        for file in session.images() {
            contents.push(self.store.read_all(file).await.unwrap());
        }
        contents
    }
}

/// A small solid-colour PNG; `shade` makes each one distinct.
pub fn png(shade: u8) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(4, 3, image::Rgb([shade, 0, 255 - shade]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn photo(bytes: Vec<u8>) -> ImageAttachment {
    let declared = bytes.len() as u64;
    photo_declared(bytes, Some(declared))
}

pub fn photo_declared(bytes: Vec<u8>, declared_size: Option<u64>) -> ImageAttachment {
    ImageAttachment {
        kind: AttachmentKind::Photo,
        data: MediaData::Bytes(bytes),
        declared_size,
    }
}

pub fn document(bytes: Vec<u8>, mime_type: &str) -> ImageAttachment {
    ImageAttachment {
        kind: AttachmentKind::Document {
            mime_type: Some(mime_type.to_string()),
        },
        declared_size: Some(bytes.len() as u64),
        data: MediaData::Bytes(bytes),
    }
}

pub fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}
