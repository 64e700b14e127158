use crate::error::{AssemblyError, IngestError};
use crate::session::{CancelOutcome, ConversationId, ExpireOutcome, SessionService, replies};
use crate::transport::{Channel, Command, EventKind, InboundEvent};

/// Run the pipeline for one event and send the resulting reply, if any.
///
/// This is the only place pipeline outcomes and errors become user-facing
/// text. Ingestion status messages are the exception: they are part of the
/// ingest pipeline itself.
pub async fn handle_event(service: &SessionService, event: InboundEvent) {
    let conversation = event.conversation;
    tracing::debug!(
        conversation = %conversation,
        event_id = %event.id,
        kind = event_label(&event.kind),
        "handling event"
    );

    let reply = match event.kind {
        EventKind::Attachment(attachment) => service
            .ingest(conversation, &attachment)
            .await
            .err()
            .map(|error| ingest_failure(conversation, &error)),
        EventKind::Command(Command::Start) => Some(replies::WELCOME.to_string()),
        EventKind::Command(Command::Help) => Some(replies::HELP.to_string()),
        EventKind::Command(Command::Generate) => service
            .generate(conversation)
            .await
            .err()
            .map(|error| assembly_failure(conversation, &error)),
        EventKind::Command(Command::Cancel) => Some(match service.cancel(conversation).await {
            CancelOutcome::Cleared { .. } => replies::CLEARED.to_string(),
            CancelOutcome::NothingToClear => replies::NOTHING_TO_CLEAR.to_string(),
        }),
        EventKind::Expire => match service.expire(conversation).await {
            ExpireOutcome::Expired { .. } => Some(replies::EXPIRED.to_string()),
            ExpireOutcome::Skipped => None,
        },
    };

    if let Some(text) = reply {
        send_reply(service.channel().as_ref(), conversation, &text).await;
    }
}

/// Send a reply, logging instead of failing.
pub(crate) async fn send_reply(channel: &dyn Channel, conversation: ConversationId, text: &str) {
    if let Err(error) = channel.send_text(conversation, text).await {
        tracing::warn!(
            conversation = %conversation,
            channel = channel.name(),
            error = %format!("{error:#}"),
            "failed to send reply"
        );
    }
}

fn ingest_failure(conversation: ConversationId, error: &IngestError) -> String {
    match error {
        IngestError::NotAnImage | IngestError::TooLarge { .. } => {
            tracing::info!(conversation = %conversation, %error, "image rejected");
        }
        IngestError::Download(_) | IngestError::Staging(_) => {
            tracing::error!(conversation = %conversation, %error, "image ingestion failed");
        }
    }
    error.user_message()
}

fn assembly_failure(conversation: ConversationId, error: &AssemblyError) -> String {
    match error {
        AssemblyError::NothingToGenerate => {
            tracing::debug!(conversation = %conversation, "generate without images");
        }
        AssemblyError::Delivery(_) => {
            tracing::warn!(conversation = %conversation, %error, "delivery failed; session kept");
        }
        AssemblyError::Load(_) | AssemblyError::Conversion(_) | AssemblyError::Staging(_) => {
            tracing::error!(conversation = %conversation, %error, "document generation failed");
        }
    }
    error.user_message()
}

fn event_label(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Attachment(_) => "attachment",
        EventKind::Command(Command::Start) => "start",
        EventKind::Command(Command::Help) => "help",
        EventKind::Command(Command::Generate) => "generate",
        EventKind::Command(Command::Cancel) => "cancel",
        EventKind::Expire => "expire",
    }
}
