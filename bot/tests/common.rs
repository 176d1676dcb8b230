//! Common utilities for bot tests: in-memory transport and provider doubles.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bot::transport::{AudioClip, ChatTransport, InboundEvent, OutboundMessage};
use bot::{Controller, TransportError};
use provider_core::{
    CreditSummary, ProviderError, SpeechProvider, Synthesis, SynthesisSettings, VoiceSummary,
};
use session_core::{ChatId, Session, SessionStore};

pub const FAKE_KEY: &str = "fake-key";
pub const FAKE_AUDIO: &[u8] = b"ID3-fake";

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message(ChatId, OutboundMessage),
    Audio(ChatId, AudioClip),
    Ack(String),
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Sent>>,
    pub fail_audio: AtomicBool,
}

impl RecordingTransport {
    pub fn messages(&self, chat_id: ChatId) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Message(id, m) if *id == chat_id => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self, chat_id: ChatId) -> Vec<String> {
        self.messages(chat_id).into_iter().map(|m| m.text).collect()
    }

    pub fn last_message(&self, chat_id: ChatId) -> OutboundMessage {
        self.messages(chat_id)
            .pop()
            .expect("no message sent to chat")
    }

    pub fn audio(&self, chat_id: ChatId) -> Vec<AudioClip> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Audio(id, clip) if *id == chat_id => Some(clip.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn acks(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Ack(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Message(chat_id, message));
        Ok(())
    }

    async fn send_audio(&self, chat_id: ChatId, clip: AudioClip) -> Result<(), TransportError> {
        if self.fail_audio.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected {
                method: "sendAudio",
                description: "Request Entity Too Large".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Audio(chat_id, clip));
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Ack(callback_id.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Succeed,
    Reject(u16),
    NoHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisCall {
    pub text: String,
    pub voice_id: String,
    pub settings: SynthesisSettings,
}

pub struct FakeProvider {
    pub synth_calls: Mutex<Vec<SynthesisCall>>,
    pub synthesis: Mutex<SynthesisOutcome>,
    pub delete_calls: Mutex<Vec<(String, String)>>,
    pub delete_result: AtomicBool,
    pub credit: Mutex<Result<CreditSummary, u16>>,
    pub voices: Mutex<Vec<VoiceSummary>>,
    pub voices_status: Mutex<Option<u16>>,
    /// When set, credit and voice lookups fail before reaching the provider.
    pub offline: AtomicBool,
    history_counter: AtomicU32,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            synth_calls: Mutex::new(Vec::new()),
            synthesis: Mutex::new(SynthesisOutcome::Succeed),
            delete_calls: Mutex::new(Vec::new()),
            delete_result: AtomicBool::new(true),
            credit: Mutex::new(Ok(CreditSummary {
                total: 10000,
                used: 2500,
                remaining: 7500,
            })),
            voices: Mutex::new(Vec::new()),
            voices_status: Mutex::new(None),
            offline: AtomicBool::new(false),
            history_counter: AtomicU32::new(0),
        }
    }
}

impl FakeProvider {
    pub fn set_synthesis(&self, outcome: SynthesisOutcome) {
        *self.synthesis.lock().unwrap() = outcome;
    }

    pub fn synth_calls(&self) -> Vec<SynthesisCall> {
        self.synth_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<(String, String)> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for FakeProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &SynthesisSettings,
    ) -> Result<Synthesis, ProviderError> {
        self.synth_calls.lock().unwrap().push(SynthesisCall {
            text: text.to_string(),
            voice_id: voice_id.to_string(),
            settings: *settings,
        });
        let outcome = *self.synthesis.lock().unwrap();
        match outcome {
            SynthesisOutcome::Succeed => {
                let n = self.history_counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Synthesis {
                    audio: FAKE_AUDIO.to_vec(),
                    api_key: FAKE_KEY.to_string(),
                    history_item_id: format!("hist-{n}"),
                })
            }
            SynthesisOutcome::Reject(status) => Err(ProviderError::SynthesisFailed { status }),
            SynthesisOutcome::NoHistory => Err(ProviderError::NoHistoryFound),
        }
    }

    async fn fetch_credit(&self) -> Result<CreditSummary, ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport(transport_error()));
        }
        let credit = *self.credit.lock().unwrap();
        credit.map_err(|status| ProviderError::CreditQueryFailed { status })
    }

    async fn delete_history_item(
        &self,
        history_item_id: &str,
        api_key: &str,
    ) -> Result<bool, ProviderError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((history_item_id.to_string(), api_key.to_string()));
        Ok(self.delete_result.load(Ordering::SeqCst))
    }

    async fn list_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport(transport_error()));
        }
        if let Some(status) = *self.voices_status.lock().unwrap() {
            return Err(ProviderError::VoiceListFailed { status });
        }
        Ok(self.voices.lock().unwrap().clone())
    }
}

/// A real `reqwest::Error`, produced without touching the network.
pub fn transport_error() -> reqwest::Error {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err()
}

/// A controller wired to recording doubles.
pub struct Harness {
    pub controller: Arc<Controller>,
    pub transport: Arc<RecordingTransport>,
    pub provider: Arc<FakeProvider>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let provider = Arc::new(FakeProvider::default());
        let controller = Arc::new(Controller::new(
            Arc::new(SessionStore::new()),
            transport.clone(),
            provider.clone(),
        ));
        Self {
            controller,
            transport,
            provider,
        }
    }

    /// Deliver a text message (commands included), as Telegram would.
    pub async fn send(&self, chat_id: ChatId, text: &str) {
        self.controller
            .handle(InboundEvent::from_text(chat_id, text))
            .await;
    }

    pub async fn press(&self, chat_id: ChatId, payload: &str) {
        self.controller
            .handle(InboundEvent::Callback {
                chat_id,
                callback_id: format!("cb-{payload}"),
                payload: payload.to_string(),
            })
            .await;
    }

    pub fn session(&self, chat_id: ChatId) -> Session {
        self.controller.sessions().get(chat_id)
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
