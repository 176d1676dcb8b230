//! Telegram Bot API adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use serde_json::json;
use session_core::ChatId;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{AudioClip, ChatTransport, InboundEvent, OutboundMessage, TextFormat};

/// Extra time on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

impl Update {
    /// The event this update carries, if the bot cares about it.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            let chat_id = query.message.as_ref()?.chat.id;
            return Some(InboundEvent::Callback {
                chat_id,
                callback_id: query.id,
                payload: query.data.unwrap_or_default(),
            });
        }
        let message = self.message?;
        let text = message.text?;
        Some(InboundEvent::from_text(message.chat.id, text))
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

impl<'a> SendMessage<'a> {
    fn new(chat_id: ChatId, message: &'a OutboundMessage) -> Self {
        let parse_mode = match message.format {
            TextFormat::Plain => None,
            TextFormat::Markdown => Some("Markdown"),
        };
        let reply_markup = (!message.buttons.is_empty()).then(|| {
            let rows: Vec<_> = message
                .buttons
                .iter()
                .map(|b| json!([{ "text": b.label, "callback_data": b.action.payload() }]))
                .collect();
            json!({ "inline_keyboard": rows })
        });
        Self {
            chat_id,
            text: &message.text,
            parse_mode,
            reply_markup,
        }
    }
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    // Holds the token; never log it.
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &B,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;
        read_envelope(method, response).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + POLL_GRACE)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;
        read_envelope("getUpdates", response).await
    }

    /// Register `url` for push delivery. Telegram echoes `secret` back in
    /// the `X-Telegram-Bot-Api-Secret-Token` header of every call.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), TransportError> {
        let mut body = json!({ "url": url, "allowed_updates": ["message", "callback_query"] });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        let _: IgnoredAny = self.call("setWebhook", &body).await?;
        Ok(())
    }

    /// Polling only works once no webhook is registered.
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: IgnoredAny = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

async fn read_envelope<T: DeserializeOwned>(
    method: &'static str,
    response: Response,
) -> Result<T, TransportError> {
    let envelope = response
        .json::<ApiResponse<T>>()
        .await
        .map_err(|e| TransportError::Http(e.without_url()))?;
    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse { description, .. } => Err(TransportError::Rejected {
            method,
            description: description.unwrap_or_else(|| "no description".to_string()),
        }),
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call("sendMessage", &SendMessage::new(chat_id, &message))
            .await?;
        debug!(chat_id, "message sent");
        Ok(())
    }

    async fn send_audio(&self, chat_id: ChatId, clip: AudioClip) -> Result<(), TransportError> {
        let bytes = clip.data.len();
        let audio = Part::bytes(clip.data)
            .file_name(clip.file_name)
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("title", clip.title)
            .part("audio", audio);

        let response = self
            .client
            .post(self.method_url("sendAudio"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;
        let _: IgnoredAny = read_envelope("sendAudio", response).await?;
        debug!(chat_id, bytes, "audio sent");
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }
}
