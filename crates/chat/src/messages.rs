use serde::{Deserialize, Serialize};

use crate::Language;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Language for the texts of the response.
    #[serde(default)]
    pub language: Language,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatTurn>>,
    /// Token from the client-side human verification widget.
    #[serde(default)]
    pub captcha_token: Option<String>,
}

/// Just the language of a request, read from bodies that fail to parse as a [`ChatRequest`].
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LanguageHint {
    #[serde(default)]
    pub language: Language,
}

/// One earlier turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the turn.
    pub role: Role,
    /// What was written.
    pub content: String,
}

/// Author of a [`ChatTurn`]. Callers cannot supply system turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The visitor.
    User,
    /// The assistant.
    Assistant,
}

/// Successful `POST /chat` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    /// The assistant's answer.
    pub response: String,
}
