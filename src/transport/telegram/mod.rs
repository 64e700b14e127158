mod api;
mod handler;
mod parse;

use crate::transport::policy::{AllowlistMatch, is_allowed_user};


pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel: long-polls the Bot API for updates
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self::with_api_base(bot_token, allowed_users, DEFAULT_API_BASE)
    }

    /// Point the channel at a Bot API compatible server (self-hosted API, tests).
    pub fn with_api_base(
        bot_token: String,
        allowed_users: Vec<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            bot_token,
            allowed_users,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    fn is_user_allowed(&self, identity: &str) -> bool {
        is_allowed_user(&self.allowed_users, identity, AllowlistMatch::CaseInsensitive)
    }

    fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }
}
