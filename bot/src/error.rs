use provider_core::ProviderError;
use thiserror::Error;

/// Failures talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram rejected {method}: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },
}

/// Bot error types
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No voice ID set. Please set one first.")]
    MissingVoiceId,

    #[error("No previous history found.")]
    MissingArtifact,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(&'static str),
}
