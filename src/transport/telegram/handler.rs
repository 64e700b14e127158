use super::TelegramChannel;
use super::parse::parse_message;
use crate::session::ConversationId;
use crate::transport::traits::{Channel, InboundEvent, MediaData, MessageRef};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn listen<'a>(
        &'a self,
        tx: tokio::sync::mpsc::Sender<InboundEvent>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let updates = match self.get_updates(offset).await {
                    Ok(updates) => updates,
                    Err(error) => {
                        tracing::warn!(error = %format!("{error:#}"), "Telegram poll error");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in updates {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let Some(message) = update.get("message") else {
                        continue;
                    };
                    let Some(parsed) = parse_message(message) else {
                        continue;
                    };

                    if !self.is_any_user_allowed(parsed.identities.iter().map(String::as_str)) {
                        tracing::warn!(
                            conversation = %parsed.conversation,
                            identities = ?parsed.identities,
                            "Telegram: ignoring message from unauthorized user"
                        );
                        continue;
                    }

                    let event = InboundEvent::new(parsed.conversation, parsed.kind);
                    tracing::debug!(
                        event_id = %event.id,
                        conversation = %event.conversation,
                        "Telegram event received"
                    );
                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
        })
    }

    fn send_text<'a>(
        &'a self,
        conversation: ConversationId,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MessageRef>> + Send + 'a>> {
        Box::pin(async move {
            let message_id = self.send_message(conversation.get(), text).await?;
            Ok(MessageRef {
                conversation,
                message_id,
            })
        })
    }

    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(self.edit_message_text(message.conversation.get(), message.message_id, text))
    }

    fn send_document<'a>(
        &'a self,
        conversation: ConversationId,
        bytes: Vec<u8>,
        display_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(self.send_document_bytes(conversation.get(), bytes, display_name))
    }

    fn fetch_media<'a>(
        &'a self,
        data: &'a MediaData,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            match data {
                MediaData::Bytes(bytes) => Ok(bytes.clone()),
                MediaData::Remote(file_id) => self.download_file(file_id).await,
            }
        })
    }

    fn health_check<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move { self.get_me().await.is_ok() })
    }
}
