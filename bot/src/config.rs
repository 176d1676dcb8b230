// Configuration loaded from the environment at startup

use std::str::FromStr;
use std::time::Duration;

use provider_core::{ProviderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT};

use crate::error::BotError;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// How updates reach the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMode {
    /// Long polling with `getUpdates`.
    Polling,
    /// Telegram pushes updates to `url`; the bot listens on `port`.
    Webhook { url: String, port: u16 },
}

#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_base_url: String,
    pub model_id: String,
    pub output_format: String,
    pub history_delay_ms: u64,
    pub history_poll_attempts: u32,
    pub telegram_api_url: String,
    pub request_timeout_secs: u64,
    pub poll_timeout_secs: u64,
    pub mode: UpdateMode,
    pub webhook_secret: Option<String>,
}

// Secrets stay out of logs.
impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("elevenlabs_api_key", &"<redacted>")
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .field("history_delay_ms", &self.history_delay_ms)
            .field("history_poll_attempts", &self.history_poll_attempts)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("mode", &self.mode)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BotError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or(BotError::Config("BOT_TOKEN must be set"))?;

        let elevenlabs_api_key =
            get("ELEVENLABS_API_KEY").ok_or(BotError::Config("ELEVENLABS_API_KEY must be set"))?;

        let elevenlabs_base_url =
            get("ELEVENLABS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model_id = get("ELEVENLABS_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        let output_format =
            get("ELEVENLABS_OUTPUT_FORMAT").unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

        let history_delay_ms = parse(get("HISTORY_DELAY_MS")).unwrap_or(1500);
        let history_poll_attempts = parse(get("HISTORY_POLL_ATTEMPTS")).unwrap_or(1u32).max(1);

        let telegram_api_url =
            get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());
        let request_timeout_secs = parse(get("REQUEST_TIMEOUT_SECS")).unwrap_or(60);
        let poll_timeout_secs = parse(get("POLL_TIMEOUT_SECS")).unwrap_or(30);

        let mode = match get("WEBHOOK_URL") {
            Some(url) => UpdateMode::Webhook {
                url,
                port: parse(get("PORT")).unwrap_or(8085),
            },
            None => UpdateMode::Polling,
        };
        let webhook_secret = get("WEBHOOK_SECRET");

        Ok(Self {
            bot_token,
            elevenlabs_api_key,
            elevenlabs_base_url,
            model_id,
            output_format,
            history_delay_ms,
            history_poll_attempts,
            telegram_api_url,
            request_timeout_secs,
            poll_timeout_secs,
            mode,
            webhook_secret,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.elevenlabs_base_url.clone(),
            model_id: self.model_id.clone(),
            output_format: self.output_format.clone(),
            history_delay: Duration::from_millis(self.history_delay_ms),
            history_attempts: self.history_poll_attempts,
            request_timeout: self.request_timeout(),
        }
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}
