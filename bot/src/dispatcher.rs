use std::sync::Arc;

use dashmap::DashMap;
use session_core::ChatId;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error};

use crate::controller::Controller;
use crate::transport::InboundEvent;

/// Fans events out to one worker per chat.
///
/// Each chat's events run in arrival order, one at a time; different chats
/// proceed independently. Workers live as long as the dispatcher: a chat's
/// task and queue are never retired, just as its session is never evicted.
pub struct Dispatcher {
    controller: Arc<Controller>,
    queues: DashMap<ChatId, UnboundedSender<InboundEvent>>,
}

impl Dispatcher {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            queues: DashMap::new(),
        }
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Queue `event` on its chat's worker. Must be called inside a Tokio runtime.
    pub fn dispatch(&self, event: InboundEvent) {
        let chat_id = event.chat_id();
        let queue = self
            .queues
            .entry(chat_id)
            .or_insert_with(|| self.spawn_worker(chat_id))
            .clone();

        if let Err(mpsc::error::SendError(event)) = queue.send(event) {
            // Worker died; replace it once.
            error!(chat_id, "chat worker gone, restarting");
            let queue = self.spawn_worker(chat_id);
            self.queues.insert(chat_id, queue.clone());
            if queue.send(event).is_err() {
                error!(chat_id, "dropping event, chat worker unavailable");
            }
        }
    }

    fn spawn_worker(&self, chat_id: ChatId) -> UnboundedSender<InboundEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = self.controller.clone();
        tokio::spawn(async move {
            debug!(chat_id, "chat worker started");
            while let Some(event) = rx.recv().await {
                controller.handle(event).await;
            }
            debug!(chat_id, "chat worker stopped");
        });
        tx
    }

    pub fn active_chats(&self) -> usize {
        self.queues.len()
    }
}
