//! Raw Bot API calls. Every call fails on a non-2xx status or `"ok": false`.

use super::TelegramChannel;
use anyhow::Context;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const POLL_TIMEOUT_SECS: u64 = 30;

impl TelegramChannel {
    async fn call(&self, method: &str, body: &Value) -> anyhow::Result<Value> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;
        read_result(method, resp).await
    }

    pub(super) async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Value>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"]
        });
        let result = self.call("getUpdates", &body).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    pub(super) async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let result = self.call("sendMessage", &body).await?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .context("Telegram sendMessage response has no message_id")
    }

    pub(super) async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        self.call("editMessageText", &body).await?;
        Ok(())
    }

    pub(super) async fn send_document_bytes(
        &self,
        chat_id: i64,
        file_bytes: Vec<u8>,
        file_name: &str,
    ) -> anyhow::Result<()> {
        let part = Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .context("Telegram sendDocument request failed")?;
        read_result("sendDocument", resp).await?;

        tracing::info!(chat_id, file_name, "Telegram document sent");
        Ok(())
    }

    /// Resolve a `file_id` with `getFile`, then download the file body.
    pub(super) async fn download_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        let result = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await?;
        let file_path = result
            .get("file_path")
            .and_then(Value::as_str)
            .context("Missing file_path in getFile response")?;

        let resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .context("Telegram file download failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Failed to download file from Telegram: {}", resp.status());
        }
        Ok(resp.bytes().await?.to_vec())
    }

    pub(super) async fn get_me(&self) -> anyhow::Result<Value> {
        let resp = self.client.get(self.api_url("getMe")).send().await?;
        read_result("getMe", resp).await
    }
}

async fn read_result(method: &str, resp: reqwest::Response) -> anyhow::Result<Value> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

    if !status.is_success() {
        anyhow::bail!("Telegram {method} failed ({status}): {text}");
    }

    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("Telegram {method} returned invalid JSON"))?;
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        anyhow::bail!("Telegram {method} returned an error: {text}");
    }
    Ok(data.get("result").cloned().unwrap_or(Value::Null))
}
