//! Chat platform boundary: what comes in, what goes out.

use async_trait::async_trait;
use session_core::ChatId;

use crate::error::TransportError;

/// Slash-commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Credit,
    Gen,
    Voices,
}

impl Command {
    /// Parse `/name` or `/name@botname`, ignoring any arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _)| name);
        match name {
            "start" => Some(Command::Start),
            "menu" => Some(Command::Menu),
            "credit" => Some(Command::Credit),
            "gen" => Some(Command::Gen),
            "voices" => Some(Command::Voices),
            _ => None,
        }
    }
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UseVoiceId,
    ChangeVoiceId,
    VoiceSettings,
    InputText,
    DeleteHistory,
}

impl Action {
    pub const fn payload(self) -> &'static str {
        match self {
            Action::UseVoiceId => "use_voice_id",
            Action::ChangeVoiceId => "change_voice_id",
            Action::VoiceSettings => "voice_settings",
            Action::InputText => "input_text",
            Action::DeleteHistory => "delete_history",
        }
    }

    pub fn from_payload(payload: &str) -> Option<Self> {
        [
            Action::UseVoiceId,
            Action::ChangeVoiceId,
            Action::VoiceSettings,
            Action::InputText,
            Action::DeleteHistory,
        ]
        .into_iter()
        .find(|action| action.payload() == payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command {
        chat_id: ChatId,
        command: Command,
    },
    /// A button press. `callback_id` must be acknowledged.
    Callback {
        chat_id: ChatId,
        callback_id: String,
        payload: String,
    },
    Text {
        chat_id: ChatId,
        text: String,
    },
}

impl InboundEvent {
    /// Classify a text message as a known command or free text.
    pub fn from_text(chat_id: ChatId, text: impl Into<String>) -> Self {
        let text = text.into();
        match Command::parse(&text) {
            Some(command) => InboundEvent::Command { chat_id, command },
            None => InboundEvent::Text { chat_id, text },
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            InboundEvent::Command { chat_id, .. }
            | InboundEvent::Callback { chat_id, .. }
            | InboundEvent::Text { chat_id, .. } => *chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// A text message, optionally with one button per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub format: TextFormat,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            buttons: Vec::new(),
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Markdown,
            ..Self::plain(text)
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// An in-memory audio attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub file_name: String,
    pub title: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;

    async fn send_audio(&self, chat_id: ChatId, clip: AudioClip) -> Result<(), TransportError>;

    /// Tell the client a button press was handled.
    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError>;
}
