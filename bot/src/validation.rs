use provider_core::SynthesisSettings;

use crate::error::BotError;

/// Number of values a settings message must contain.
const SETTINGS_FIELDS: usize = 4;
/// Settings are entered on a 0–100 scale and stored as fractions.
const PERCENT_SCALE: f64 = 100.0;

/// Parse `stability similarity style boost` into synthesis settings.
///
/// The first three values are divided by 100; the fourth is a flag where
/// any non-zero number means "on". Ranges are left to the provider.
pub fn parse_settings(input: &str) -> Result<SynthesisSettings, BotError> {
    let values = input
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| BotError::InvalidInput(format!("'{token}' is not a number")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [stability, similarity, style, boost] = values[..] else {
        return Err(BotError::InvalidInput(format!(
            "expected {SETTINGS_FIELDS} numbers, got {}",
            values.len()
        )));
    };

    Ok(SynthesisSettings {
        stability: stability / PERCENT_SCALE,
        similarity_boost: similarity / PERCENT_SCALE,
        style: style / PERCENT_SCALE,
        use_speaker_boost: boost != 0.0,
    })
}

/// Voice ids are taken as typed, minus surrounding whitespace.
pub fn normalize_voice_id(input: &str) -> Result<String, BotError> {
    let voice_id = input.trim();
    if voice_id.is_empty() {
        return Err(BotError::InvalidInput("Voice ID cannot be empty".to_string()));
    }
    Ok(voice_id.to_string())
}
