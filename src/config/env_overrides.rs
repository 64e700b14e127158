use super::{Config, TelegramConfig};
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) =
            std::env::var("PDFBINDER_BOT_TOKEN").or_else(|_| std::env::var("TELEGRAM_BOT_TOKEN"))
            && !token.is_empty()
        {
            self.telegram
                .get_or_insert_with(TelegramConfig::default)
                .bot_token = token;
        }

        if let Ok(workspace) = std::env::var("PDFBINDER_WORKSPACE")
            && !workspace.is_empty()
        {
            self.workspace_dir = PathBuf::from(workspace);
        }

        if let Ok(dir) = std::env::var("PDFBINDER_STORAGE_DIR")
            && !dir.is_empty()
        {
            self.storage.dir = Some(dir);
        }

        if let Ok(limit_str) = std::env::var("PDFBINDER_MAX_IMAGE_BYTES")
            && let Ok(limit) = limit_str.trim().parse::<u64>()
            && limit > 0
        {
            self.storage.max_image_bytes = limit;
        }
    }
}
