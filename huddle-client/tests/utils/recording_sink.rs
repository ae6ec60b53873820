use async_trait::async_trait;
use huddle_client::engine::SignalSink;
use huddle_core::ClientMessage;
use std::sync::{Arc, Mutex};

/// Captures every outbound signaling message for assertions.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<ClientMessage>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn offers(&self) -> Vec<ClientMessage> {
        self.sent()
            .into_iter()
            .filter(|m| matches!(m, ClientMessage::WebrtcOffer { .. }))
            .collect()
    }

    pub fn answers(&self) -> Vec<ClientMessage> {
        self.sent()
            .into_iter()
            .filter(|m| matches!(m, ClientMessage::WebrtcAnswer { .. }))
            .collect()
    }
}

#[async_trait]
impl SignalSink for RecordingSink {
    async fn send(&self, msg: ClientMessage) {
        self.sent.lock().unwrap().push(msg);
    }
}
