use thiserror::Error;

/// Failures talking to the speech provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to ElevenLabs failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Voice generation failed. Status code: {status}")]
    SynthesisFailed { status: u16 },

    #[error("Failed to retrieve history. Status code: {status}")]
    HistoryQueryFailed { status: u16 },

    /// The history listing could not be fetched or read.
    #[error("Failed to retrieve history: {0}")]
    HistoryUnavailable(#[source] reqwest::Error),

    #[error("No history found in ElevenLabs.")]
    NoHistoryFound,

    #[error("Credit query failed. Status code: {status}")]
    CreditQueryFailed { status: u16 },

    #[error("Failed to fetch voice list: {status}")]
    VoiceListFailed { status: u16 },
}

impl ProviderError {
    /// HTTP status the provider answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::SynthesisFailed { status }
            | ProviderError::HistoryQueryFailed { status }
            | ProviderError::CreditQueryFailed { status }
            | ProviderError::VoiceListFailed { status } => Some(*status),
            ProviderError::Transport(e) | ProviderError::HistoryUnavailable(e) => {
                e.status().map(|s| s.as_u16())
            }
            ProviderError::NoHistoryFound => None,
        }
    }
}
