use serde_json::Value;

use crate::session::ConversationId;
use crate::transport::traits::{AttachmentKind, Command, EventKind, ImageAttachment, MediaData};

/// The parts of a Telegram `message` the session core cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ParsedMessage {
    pub conversation: ConversationId,
    pub identities: Vec<String>,
    pub kind: EventKind,
}

/// Classify a `message` object. Returns `None` for anything that is neither an
/// attachment nor a known command.
pub(super) fn parse_message(message: &Value) -> Option<ParsedMessage> {
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;

    let kind = if let Some(photo) = largest_photo(message) {
        EventKind::Attachment(photo)
    } else if let Some(document) = message.get("document") {
        EventKind::Attachment(document_attachment(document)?)
    } else {
        let text = message.get("text").and_then(Value::as_str)?;
        EventKind::Command(Command::parse(text)?)
    };

    Some(ParsedMessage {
        conversation: ConversationId::new(chat_id),
        identities: sender_identities(message),
        kind,
    })
}

/// Telegram lists photo sizes smallest first.
fn largest_photo(message: &Value) -> Option<ImageAttachment> {
    let size = message.get("photo")?.as_array()?.last()?;
    let file_id = size.get("file_id").and_then(Value::as_str)?;
    Some(ImageAttachment {
        kind: AttachmentKind::Photo,
        data: MediaData::Remote(file_id.to_string()),
        declared_size: size.get("file_size").and_then(Value::as_u64),
    })
}

fn document_attachment(document: &Value) -> Option<ImageAttachment> {
    let file_id = document.get("file_id").and_then(Value::as_str)?;
    Some(ImageAttachment {
        kind: AttachmentKind::Document {
            mime_type: document
                .get("mime_type")
                .and_then(Value::as_str)
                .map(String::from),
        },
        data: MediaData::Remote(file_id.to_string()),
        declared_size: document.get("file_size").and_then(Value::as_u64),
    })
}

fn sender_identities(message: &Value) -> Vec<String> {
    let from = message.get("from");
    let mut identities = Vec::with_capacity(2);
    if let Some(username) = from
        .and_then(|f| f.get("username"))
        .and_then(Value::as_str)
    {
        identities.push(username.to_string());
    }
    if let Some(id) = from.and_then(|f| f.get("id")).and_then(Value::as_i64) {
        identities.push(id.to_string());
    }
    identities
}
