use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /summarise`. Only the user message travels over the wire;
/// the system instruction is added server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub texts: Option<ChatMessage>,
}

/// Body of a successful `POST /extract-pdf`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub data: String,
}
