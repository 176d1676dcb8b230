use serde::{Deserialize, Serialize};

/// Voice settings sent with every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// Result of a successful synthesis.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    /// Key the request was billed to; deleting the history item needs it.
    pub api_key: String,
    pub history_item_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditSummary {
    pub total: u64,
    pub used: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceSummary {
    pub name: String,
    pub voice_id: String,
}

/// Body of `POST /text-to-speech/{voice_id}`
#[derive(Serialize)]
pub(crate) struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: &'a SynthesisSettings,
    pub output_format: &'a str,
    pub with_history: bool,
}

#[derive(Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryItem>,
}

#[derive(Deserialize)]
pub(crate) struct HistoryItem {
    pub history_item_id: String,
}

#[derive(Deserialize)]
pub(crate) struct SubscriptionResponse {
    #[serde(default)]
    pub character_limit: u64,
    #[serde(default)]
    pub character_count: u64,
}

impl From<SubscriptionResponse> for CreditSummary {
    fn from(sub: SubscriptionResponse) -> Self {
        Self {
            total: sub.character_limit,
            used: sub.character_count,
            remaining: sub.character_limit.saturating_sub(sub.character_count),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<VoiceSummary>,
}
