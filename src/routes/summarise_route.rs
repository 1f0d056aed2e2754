use std::sync::Arc;

use tracing::{debug, info};

use crate::http::error::{GatewayError, INVALID_REQUEST_BODY};
use crate::http::types::{ChatMessage, Role, SummaryRequest};
use crate::utils::completion::CompletionProvider;
use crate::utils::content_guard::{char_len, log_preview};

/// Instruction prepended to every summarisation request.
pub const SYSTEM_INSTRUCTION: &str = "Your task is to employ a highly advanced AI text summarizer capable of distilling intricate narratives into refined and nuanced summaries. The summarizer should refrain from generic attributions such as 'the speaker' and instead employ a more sophisticated approach to convey information. your response should be short and precise";

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 5000;

/// Handles `POST /summarise`.
pub struct SummariseRoute {
    provider: Arc<dyn CompletionProvider>,
    /// `0` disables the cap.
    max_message_chars: usize,
}

impl SummariseRoute {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_message_chars: usize) -> Self {
        Self {
            provider,
            max_message_chars,
        }
    }

    /// Decodes a raw request body, applies the input cap, and summarises.
    pub async fn execute(&self, body: &[u8]) -> Result<ChatMessage, GatewayError> {
        let request = serde_json::from_slice::<SummaryRequest>(body).map_err(|e| {
            debug!("Rejecting undecodable summarise body: {}", e);
            GatewayError::InvalidRequest(INVALID_REQUEST_BODY.to_string())
        })?;

        if let Some(message) = &request.texts {
            let length = char_len(&message.content);
            if self.max_message_chars > 0 && length > self.max_message_chars {
                info!(
                    "Rejecting message of {} characters (limit {})",
                    length, self.max_message_chars
                );
                return Err(GatewayError::InvalidRequest(format!(
                    "Message is too long: only {} characters allowed",
                    self.max_message_chars
                )));
            }
        }

        self.summarise(request.texts).await
    }

    /// Forwards a single user message, behind the fixed system instruction, to
    /// the completion provider and returns its reply verbatim. Performs no
    /// length check.
    pub async fn summarise(&self, texts: Option<ChatMessage>) -> Result<ChatMessage, GatewayError> {
        let message = match texts {
            Some(message) if !message.content.trim().is_empty() => message,
            _ => return Err(GatewayError::InvalidRequest(INVALID_REQUEST_BODY.to_string())),
        };

        if message.role != Role::User {
            debug!("Rejecting message with role {:?}", message.role);
            return Err(GatewayError::InvalidRequest(INVALID_REQUEST_BODY.to_string()));
        }

        if !self.provider.is_configured() {
            return Err(GatewayError::Configuration);
        }

        debug!("Summarising: {}", log_preview(&message.content));

        let messages = build_messages(message);
        let reply = self.provider.complete(&messages).await?;

        info!("Summary generated ({} characters)", char_len(&reply.content));
        Ok(reply)
    }
}

fn build_messages(user: ChatMessage) -> [ChatMessage; 2] {
    [ChatMessage::system(SYSTEM_INSTRUCTION), user]
}
