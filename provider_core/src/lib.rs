mod error;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

pub use error::ProviderError;
pub use types::{CreditSummary, Synthesis, SynthesisSettings, VoiceSummary};

use types::{HistoryResponse, SubscriptionResponse, SynthesisRequest, VoicesResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

const XI_API_KEY_HEADER: &str = "xi-api-key";
pub const UNKNOWN_VOICE: &str = "Unknown";

/// Operations the bot needs from a text-to-speech provider.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `text` and look up the history item the provider recorded for it.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &SynthesisSettings,
    ) -> Result<Synthesis, ProviderError>;

    async fn fetch_credit(&self) -> Result<CreditSummary, ProviderError>;

    /// Returns whether the provider acknowledged the delete. An item that
    /// was already gone is indistinguishable from a failed delete.
    async fn delete_history_item(
        &self,
        history_item_id: &str,
        api_key: &str,
    ) -> Result<bool, ProviderError>;

    async fn list_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError>;

    /// Name of the voice with `voice_id`, or `"Unknown"`.
    async fn resolve_voice_name(&self, voice_id: &str) -> Result<String, ProviderError> {
        let voices = self.list_voices().await?;
        Ok(voices
            .into_iter()
            .find(|v| v.voice_id == voice_id)
            .map(|v| v.name)
            .unwrap_or_else(|| UNKNOWN_VOICE.to_string()))
    }
}

/// Client settings. Defaults match the public ElevenLabs API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model_id: String,
    pub output_format: String,
    /// Wait before the first history query; the history index lags the synthesis call.
    pub history_delay: Duration,
    /// Number of history queries before giving up with `NoHistoryFound`.
    /// The delay doubles between attempts.
    pub history_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            history_delay: Duration::from_millis(1500),
            history_attempts: 1,
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct ElevenLabsClient {
    api_key: String,
    client: Client,
    config: ProviderConfig,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>, config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            client,
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Most recent history item id, `None` if the listing is empty.
    async fn latest_history_item(&self) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(self.url("history"))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(ProviderError::HistoryUnavailable)?;

        if !response.status().is_success() {
            return Err(ProviderError::HistoryQueryFailed {
                status: response.status().as_u16(),
            });
        }

        let listing = response
            .json::<HistoryResponse>()
            .await
            .map_err(ProviderError::HistoryUnavailable)?;
        Ok(listing.history.into_iter().next().map(|item| item.history_item_id))
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &SynthesisSettings,
    ) -> Result<Synthesis, ProviderError> {
        let text = normalize_text(text);
        let body = SynthesisRequest {
            text: &text,
            model_id: &self.config.model_id,
            voice_settings: settings,
            output_format: &self.config.output_format,
            with_history: true,
        };

        let response = self
            .client
            .post(self.url(&format!("text-to-speech/{voice_id}")))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(voice_id, status = status.as_u16(), "synthesis rejected");
            return Err(ProviderError::SynthesisFailed {
                status: status.as_u16(),
            });
        }
        let audio = response.bytes().await?.to_vec();
        info!(voice_id, bytes = audio.len(), "synthesis complete");

        let attempts = self.config.history_attempts.max(1);
        let mut delay = self.config.history_delay;
        for attempt in 1..=attempts {
            tokio::time::sleep(delay).await;
            if let Some(history_item_id) = self.latest_history_item().await? {
                return Ok(Synthesis {
                    audio,
                    api_key: self.api_key.clone(),
                    history_item_id,
                });
            }
            debug!(attempt, attempts, "history listing still empty");
            delay = delay.saturating_mul(2);
        }

        Err(ProviderError::NoHistoryFound)
    }

    async fn fetch_credit(&self) -> Result<CreditSummary, ProviderError> {
        let response = self
            .client
            .get(self.url("user/subscription"))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::CreditQueryFailed {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<SubscriptionResponse>().await?.into())
    }

    async fn delete_history_item(
        &self,
        history_item_id: &str,
        api_key: &str,
    ) -> Result<bool, ProviderError> {
        let response = self
            .client
            .delete(self.url(&format!("history/{history_item_id}")))
            .header(XI_API_KEY_HEADER, api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(history_item_id, status = status.as_u16(), "history delete refused");
        }
        Ok(status.is_success())
    }

    async fn list_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError> {
        let response = self
            .client
            .get(self.url("voices"))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::VoiceListFailed {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<VoicesResponse>().await?.voices)
    }
}

/// Round-trips `text` through UTF-16 so the payload only carries characters
/// representable as surrogate pairs. Unpaired surrogates become U+FFFD.
pub fn normalize_text(text: &str) -> String {
    char::decode_utf16(text.encode_utf16())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
