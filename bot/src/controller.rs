//! Conversation flow: commands, button presses and state-routed free text.

use std::sync::Arc;

use provider_core::{CreditSummary, ProviderError, SpeechProvider, UNKNOWN_VOICE};
use session_core::{ChatId, LastArtifact, SessionState, SessionStore};
use tracing::{debug, error, info, warn};

use crate::error::BotError;
use crate::transport::{
    Action, AudioClip, Button, ChatTransport, Command, InboundEvent, OutboundMessage,
};
use crate::validation::{normalize_voice_id, parse_settings};

const WELCOME: &str = "👋 Welcome! Use /menu to see available commands.";
const MENU: &str = "*Available Commands:*\n\n\
    /start - Welcome message\n\
    /menu - Show this command list\n\
    /credit - Show ElevenLabs credit balance\n\
    /gen - Start voice generation\n\
    /voices - List available voices";
const SETTINGS_PROMPT: &str =
    "⚙️ Enter settings as:\n`stability similarity style boost`\nExample: `50 70 0 1`";
const SETTINGS_INVALID: &str = "❌ Invalid input. Please enter 4 numbers like: `50 70 0 1`";
const AUDIO_TITLE: &str = "Generated Voice";

pub struct Controller {
    sessions: Arc<SessionStore>,
    transport: Arc<dyn ChatTransport>,
    provider: Arc<dyn SpeechProvider>,
}

impl Controller {
    pub fn new(
        sessions: Arc<SessionStore>,
        transport: Arc<dyn ChatTransport>,
        provider: Arc<dyn SpeechProvider>,
    ) -> Self {
        Self {
            sessions,
            transport,
            provider,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one event to completion. Failures are logged and never escape.
    ///
    /// Two events for the same chat must not run concurrently; the
    /// [`Dispatcher`](crate::dispatcher::Dispatcher) serializes them.
    pub async fn handle(&self, event: InboundEvent) {
        let chat_id = event.chat_id();
        if let Err(e) = self.route(event).await {
            error!(chat_id, "failed to handle event: {e}");
        }
    }

    async fn route(&self, event: InboundEvent) -> Result<(), BotError> {
        match event {
            InboundEvent::Command { chat_id, command } => {
                debug!(chat_id, ?command, "command");
                match command {
                    Command::Start => self.send(chat_id, OutboundMessage::plain(WELCOME)).await,
                    Command::Menu => self.send(chat_id, OutboundMessage::markdown(MENU)).await,
                    Command::Credit => self.credit(chat_id).await,
                    Command::Gen => self.gen(chat_id).await,
                    Command::Voices => self.voices(chat_id).await,
                }
            }
            InboundEvent::Callback {
                chat_id,
                callback_id,
                payload,
            } => {
                if let Err(e) = self.transport.acknowledge(&callback_id).await {
                    warn!(chat_id, "could not acknowledge button press: {e}");
                }
                let Some(action) = Action::from_payload(&payload) else {
                    debug!(chat_id, payload = %payload, "ignoring unknown button");
                    return Ok(());
                };
                debug!(chat_id, ?action, "button");
                match action {
                    Action::UseVoiceId => self.use_voice_id(chat_id).await,
                    Action::ChangeVoiceId => self.change_voice_id(chat_id).await,
                    Action::VoiceSettings => self.ask_settings(chat_id).await,
                    Action::InputText => self.ask_text(chat_id).await,
                    Action::DeleteHistory => self.delete_history(chat_id).await,
                }
            }
            InboundEvent::Text { chat_id, text } => match self.sessions.state(chat_id) {
                SessionState::Idle => {
                    debug!(chat_id, "ignoring free text while idle");
                    Ok(())
                }
                SessionState::AwaitingVoiceId => self.set_voice_id(chat_id, &text).await,
                SessionState::AwaitingSettings => self.save_settings(chat_id, &text).await,
                SessionState::AwaitingText => self.generate(chat_id, &text).await,
            },
        }
    }

    async fn send(&self, chat_id: ChatId, message: OutboundMessage) -> Result<(), BotError> {
        self.transport.send_message(chat_id, message).await?;
        Ok(())
    }

    async fn credit(&self, chat_id: ChatId) -> Result<(), BotError> {
        let message = match self.provider.fetch_credit().await {
            Ok(credit) => OutboundMessage::markdown(credit_summary(&credit)),
            Err(ProviderError::CreditQueryFailed { status }) => {
                OutboundMessage::plain(format!("Error: {status}"))
            }
            Err(e) => {
                warn!(chat_id, "credit query failed: {e}");
                OutboundMessage::plain(format!("Exception: {e}"))
            }
        };
        self.send(chat_id, message).await
    }

    async fn voices(&self, chat_id: ChatId) -> Result<(), BotError> {
        let message = match self.provider.list_voices().await {
            Ok(voices) if voices.is_empty() => OutboundMessage::plain("No voices found."),
            Ok(voices) => {
                let lines: Vec<String> = voices
                    .iter()
                    .map(|v| format!("{} — `{}`", escape_markdown(&v.name), v.voice_id))
                    .collect();
                OutboundMessage::markdown(format!("*Available Voices:*\n\n{}", lines.join("\n")))
            }
            Err(e) => OutboundMessage::plain(format!("❌ Error: {e}")),
        };
        self.send(chat_id, message).await
    }

    async fn gen(&self, chat_id: ChatId) -> Result<(), BotError> {
        let message = OutboundMessage::plain("🎙️ Voice Generation Options:").with_buttons(vec![
            Button::new("1. Your Set Voice ID", Action::UseVoiceId),
            Button::new("2. Change Your Voice ID", Action::ChangeVoiceId),
        ]);
        self.send(chat_id, message).await
    }

    async fn use_voice_id(&self, chat_id: ChatId) -> Result<(), BotError> {
        if self.sessions.get(chat_id).voice_id.is_none() {
            return self.notify_missing(chat_id, BotError::MissingVoiceId).await;
        }
        self.show_gen_options(chat_id).await
    }

    async fn change_voice_id(&self, chat_id: ChatId) -> Result<(), BotError> {
        self.sessions.set_state(chat_id, SessionState::AwaitingVoiceId);
        self.send(
            chat_id,
            OutboundMessage::plain("✏️ Enter your new ElevenLabs Voice ID:"),
        )
        .await
    }

    async fn set_voice_id(&self, chat_id: ChatId, text: &str) -> Result<(), BotError> {
        let voice_id = match normalize_voice_id(text) {
            Ok(voice_id) => voice_id,
            Err(e) => return self.send(chat_id, OutboundMessage::plain(format!("❌ {e}"))).await,
        };

        self.sessions.update(chat_id, |s| {
            s.voice_id = Some(voice_id.clone());
            s.state = SessionState::Idle;
        });
        info!(chat_id, voice_id = %voice_id, "voice id set");

        let name = match self.provider.resolve_voice_name(&voice_id).await {
            Ok(name) if name != UNKNOWN_VOICE => Some(name),
            Ok(_) => None,
            Err(e) => {
                warn!(chat_id, "voice name lookup failed: {e}");
                None
            }
        };
        self.send(chat_id, voice_id_confirmation(&voice_id, name.as_deref()))
            .await?;
        self.show_gen_options(chat_id).await
    }

    async fn show_gen_options(&self, chat_id: ChatId) -> Result<(), BotError> {
        let message = OutboundMessage::plain("➡️ Select what to do next:").with_buttons(vec![
            Button::new("1. Voice Settings", Action::VoiceSettings),
            Button::new("2. Input Your Text", Action::InputText),
        ]);
        self.send(chat_id, message).await
    }

    async fn ask_settings(&self, chat_id: ChatId) -> Result<(), BotError> {
        self.sessions.set_state(chat_id, SessionState::AwaitingSettings);
        self.send(chat_id, OutboundMessage::markdown(SETTINGS_PROMPT))
            .await
    }

    async fn save_settings(&self, chat_id: ChatId, text: &str) -> Result<(), BotError> {
        let settings = match parse_settings(text) {
            Ok(settings) => settings,
            Err(e) => {
                debug!(chat_id, "rejected settings: {e}");
                return self
                    .send(chat_id, OutboundMessage::markdown(SETTINGS_INVALID))
                    .await;
            }
        };

        self.sessions.update(chat_id, |s| {
            s.settings = settings;
            s.state = SessionState::Idle;
        });
        info!(chat_id, ?settings, "settings saved");
        self.send(chat_id, OutboundMessage::plain("✅ Settings saved."))
            .await?;
        self.show_gen_options(chat_id).await
    }

    async fn ask_text(&self, chat_id: ChatId) -> Result<(), BotError> {
        self.sessions.set_state(chat_id, SessionState::AwaitingText);
        self.send(
            chat_id,
            OutboundMessage::plain("✏️ Send the text you want to convert to voice:"),
        )
        .await
    }

    async fn generate(&self, chat_id: ChatId, text: &str) -> Result<(), BotError> {
        let session = self.sessions.get(chat_id);
        let Some(voice_id) = session.voice_id else {
            return self.notify_missing(chat_id, BotError::MissingVoiceId).await;
        };

        let outcome = self
            .generate_and_deliver(chat_id, text.trim(), &voice_id, &session.settings)
            .await;
        self.sessions.set_state(chat_id, SessionState::Idle);

        match outcome {
            Ok(()) => {
                let message = OutboundMessage::plain("✅ Done. Choose an action:").with_buttons(
                    vec![Button::new("🗑️ Delete from ElevenLabs", Action::DeleteHistory)],
                );
                self.send(chat_id, message).await
            }
            Err(e) => {
                warn!(chat_id, voice_id = %voice_id, "generation failed: {e}");
                self.send(chat_id, OutboundMessage::plain(format!("❌ Error: {e}")))
                    .await
            }
        }
    }

    /// Synthesize, deliver the clip and remember it. Only a delivered clip
    /// replaces the previous artifact.
    async fn generate_and_deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        voice_id: &str,
        settings: &provider_core::SynthesisSettings,
    ) -> Result<(), BotError> {
        self.send(
            chat_id,
            OutboundMessage::plain("🎧 Generating voice... Please wait."),
        )
        .await?;

        let synthesis = self.provider.synthesize(text, voice_id, settings).await?;
        let clip = AudioClip {
            file_name: format!("output_{chat_id}.mp3"),
            title: AUDIO_TITLE.to_string(),
            data: synthesis.audio,
        };
        self.transport.send_audio(chat_id, clip).await?;

        info!(chat_id, history_item_id = %synthesis.history_item_id, "voice delivered");
        self.sessions.update(chat_id, |s| {
            s.last_artifact = Some(LastArtifact {
                history_item_id: synthesis.history_item_id,
                api_key: synthesis.api_key,
            });
        });
        Ok(())
    }

    async fn delete_history(&self, chat_id: ChatId) -> Result<(), BotError> {
        let Some(artifact) = self.sessions.get(chat_id).last_artifact else {
            return self.notify_missing(chat_id, BotError::MissingArtifact).await;
        };

        let reply = match self
            .provider
            .delete_history_item(&artifact.history_item_id, &artifact.api_key)
            .await
        {
            Ok(true) => {
                info!(chat_id, history_item_id = %artifact.history_item_id, "history item deleted");
                "🗑️ Deleted from ElevenLabs history.".to_string()
            }
            Ok(false) => "❌ Failed to delete from history.".to_string(),
            Err(e) => {
                warn!(chat_id, "history delete failed: {e}");
                format!("❌ Exception: {e}")
            }
        };
        self.send(chat_id, OutboundMessage::plain(reply)).await
    }

    async fn notify_missing(&self, chat_id: ChatId, reason: BotError) -> Result<(), BotError> {
        debug!(chat_id, "missing prerequisite: {reason}");
        self.send(chat_id, OutboundMessage::plain(format!("⚠️ {reason}")))
            .await
    }
}

fn credit_summary(credit: &CreditSummary) -> String {
    format!(
        "*ElevenLabs API Credit Summary:*\n\
         Total Characters: {}\n\
         Used Characters: {}\n\
         Remaining Characters: {}",
        credit.total, credit.used, credit.remaining
    )
}

fn voice_id_confirmation(voice_id: &str, name: Option<&str>) -> OutboundMessage {
    // A backtick in the id would end the code span early.
    if voice_id.contains('`') {
        return OutboundMessage::plain(format!("✅ Voice ID set: {voice_id}"));
    }
    match name {
        Some(name) => OutboundMessage::markdown(format!(
            "✅ Voice ID set: `{voice_id}` ({})",
            escape_markdown(name)
        )),
        None => OutboundMessage::markdown(format!("✅ Voice ID set: `{voice_id}`")),
    }
}

/// Escape the characters legacy Markdown treats as entity markers.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
