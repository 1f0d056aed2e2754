use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::http::types::ChatMessage;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: HTTP Status: {status}")]
    Api { status: u16 },

    #[error("Malformed completion response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Completion response contained no choices")]
    NoChoices,

    #[error("No API key configured for the completion provider")]
    MissingCredential,
}

/// A hosted chat-completion model.
pub trait CompletionProvider: Send + Sync {
    /// Whether a credential is available. Callers check this before `complete`.
    fn is_configured(&self) -> bool;

    /// Sends `messages` and returns the first choice's message unmodified.
    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<ChatMessage, CompletionError>>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// `None` keeps reqwest's default of waiting indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let endpoint = if settings.base_url.contains("/chat/completions") {
            settings.base_url
        } else {
            format!("{}/chat/completions", settings.base_url.trim_end_matches('/'))
        };

        Ok(Self {
            client,
            api_key: settings.api_key.filter(|key| !key.is_empty()),
            endpoint,
            model: settings.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingCredential)?;

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        debug!(
            "Sending {} message(s) to {} (model: {})",
            messages.len(),
            self.endpoint,
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await?
            .error_for_status();

        match response {
            Ok(response) => {
                let response_text = response.text().await?;
                let completion = serde_json::from_str::<ChatCompletionResponse>(&response_text)?;

                completion
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message)
                    .ok_or(CompletionError::NoChoices)
            }
            Err(err) => {
                if let Some(status) = err.status() {
                    error!("Completion API error: Status {}", status);
                    return Err(CompletionError::Api {
                        status: status.as_u16(),
                    });
                }
                Err(CompletionError::Request(err))
            }
        }
    }
}

impl CompletionProvider for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<ChatMessage, CompletionError>> {
        Box::pin(self.send(messages))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::http::types::Role;

    #[derive(Default)]
    struct Captured {
        bodies: Vec<Value>,
        authorization: Vec<String>,
    }

    /// Serves a fixed reply on `/v1/chat/completions` and records every request.
    async fn spawn_upstream(status: StatusCode, reply: String) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let sink = captured.clone();

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                let reply = reply.clone();
                async move {
                    let mut captured = sink.lock().unwrap();
                    captured.bodies.push(body);
                    if let Some(auth) = headers.get("authorization") {
                        captured
                            .authorization
                            .push(auth.to_str().unwrap().to_string());
                    }
                    (status, reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), captured)
    }

    fn client_for(base_url: String, api_key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(OpenAiSettings {
            api_key: api_key.map(str::to_string),
            base_url,
            model: DEFAULT_MODEL.to_string(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    fn completion_body(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        })
        .to_string()
    }

    #[tokio::test]
    async fn posts_messages_and_returns_first_choice() {
        let (base_url, captured) =
            spawn_upstream(StatusCode::OK, completion_body("A fox jumps.")).await;
        let client = client_for(base_url, Some("sk-test"));

        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("The quick brown fox..."),
        ];
        let reply = client.complete(&messages).await.unwrap();
        assert_eq!(reply, ChatMessage::assistant("A fox jumps."));

        let captured = captured.lock().unwrap();
        assert_eq!(captured.authorization, vec!["Bearer sk-test".to_string()]);
        assert_eq!(
            captured.bodies[0],
            json!({
                "model": DEFAULT_MODEL,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "The quick brown fox..."}
                ]
            })
        );
    }

    #[tokio::test]
    async fn upstream_status_error_is_reported() {
        let (base_url, _) = spawn_upstream(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "quota"}}).to_string(),
        )
        .await;
        let client = client_for(base_url, Some("sk-test"));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: 429 }));
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let (base_url, _) = spawn_upstream(StatusCode::OK, "not json".to_string()).await;
        let client = client_for(base_url, Some("sk-test"));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }

    #[tokio::test]
    async fn empty_choices_are_reported() {
        let (base_url, _) =
            spawn_upstream(StatusCode::OK, json!({"choices": []}).to_string()).await;
        let client = client_for(base_url, Some("sk-test"));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::NoChoices));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/v1", addr), Some("sk-test"));
        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Request(_)));
    }

    #[test]
    fn empty_key_counts_as_unconfigured() {
        let unset = client_for(DEFAULT_BASE_URL.to_string(), None);
        let empty = client_for(DEFAULT_BASE_URL.to_string(), Some(""));
        let set = client_for(DEFAULT_BASE_URL.to_string(), Some("sk-test"));
        assert!(!unset.is_configured());
        assert!(!empty.is_configured());
        assert!(set.is_configured());
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let client = client_for("https://example.test/v1/".to_string(), None);
        assert_eq!(client.endpoint, "https://example.test/v1/chat/completions");
        let explicit = client_for("https://example.test/v1/chat/completions".to_string(), None);
        assert_eq!(explicit.endpoint, "https://example.test/v1/chat/completions");
    }

    #[test]
    fn reply_role_is_preserved() {
        let parsed: ChatCompletionResponse = serde_json::from_str(&completion_body("x")).unwrap();
        assert_eq!(parsed.choices[0].message.role, Role::Assistant);
    }
}
