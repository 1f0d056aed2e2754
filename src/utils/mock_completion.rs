//! Mock completion provider for testing.

use std::sync::Mutex;

use futures::future::BoxFuture;

use super::completion::{CompletionError, CompletionProvider};
use crate::http::types::ChatMessage;

#[derive(Clone, Debug)]
pub enum MockReply {
    Message(ChatMessage),
    /// Simulate an upstream HTTP error status.
    Status(u16),
}

/// A hand-rolled mock implementing [`CompletionProvider`] that records every
/// outbound message list.
pub struct MockProvider {
    configured: bool,
    reply: MockReply,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockProvider {
    pub fn replying(content: &str) -> Self {
        Self {
            configured: true,
            reply: MockReply::Message(ChatMessage::assistant(content)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            configured: true,
            reply: MockReply::Status(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying("unused")
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionProvider for MockProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<ChatMessage, CompletionError>> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let result = match &self.reply {
            MockReply::Message(message) => Ok(message.clone()),
            MockReply::Status(status) => Err(CompletionError::Api { status: *status }),
        };
        Box::pin(async move { result })
    }
}
