//! Chat widget backed by a generative-AI service.
//!
//! # Overview
//!
//! The [`ChatBackend`] trait creates conversational sessions and the
//! [`ChatSession`] trait sends one message within a session. The
//! [`widget::ChatWidget`] builds the portfolio assistant on top of them:
//! lazy session creation, an append-only transcript, and deduplicated
//! external query injection.
//!
//! # Backends
//!
//! - [`gemini::GeminiBackend`]: Google Gemini `generateContent` REST API

pub mod gemini;
pub mod widget;

pub use gemini::GeminiBackend;
pub use widget::{ChatCapability, ChatFeature, ChatSnapshot, ChatWidget, QueryDisposition};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default Gemini model for the assistant.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Shown when a turn fails for any reason.
pub const FALLBACK_APOLOGY: &str =
    "I'm having trouble connecting right now. Please try again later.";

/// Shown when the service answers with no text.
pub const EMPTY_RESPONSE: &str = "I'm sorry, I couldn't generate a response.";

/// First transcript entry of every widget.
pub const GREETING: &str = "Hi! I'm an AI assistant trained on this portfolio. Ask me anything \
about the candidate's work experience at HivePro, technical skills, or education!";

/// System instruction given to every new session.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional portfolio assistant for a Senior Frontend Engineer.
The candidate has 6+ years of experience.
Key Companies: Stamina HivePro (Senior Eng, 2021-Present), Borngroup (Frontend Dev, 2019-2021), In Solutions Global (Software Eng, 2017-2019).
Tech Stack: React, TypeScript, Next.js, Tailwind, Node.js.
Education: Masters in CS (Tech University), Bachelors in Tech (State Engineering College).

Tone: Professional, concise, enthusiastic, and helpful.
If asked about contact info, suggest emailing hello@example.com.
Keep answers short (under 50 words) unless asked for elaboration.";

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
}

impl Message {
    /// Create a message with a fresh id.
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
        }
    }

    /// The opening assistant message.
    #[must_use]
    pub fn greeting() -> Self {
        Self {
            id: "0".to_string(),
            role: Role::Model,
            text: GREETING.to_string(),
        }
    }
}

/// Errors from chat backends and sessions.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No API key is configured.
    #[error("no chat credential configured")]
    MissingCredential,

    /// A send was attempted before a session existed.
    #[error("Chat not initialized")]
    SessionUnavailable,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid service URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Creates conversational sessions.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Create a session bound to `system_prompt`.
    async fn create_session(&self, system_prompt: &str) -> Result<Arc<dyn ChatSession>, ChatError>;
}

/// A live conversation that keeps its own history.
#[async_trait::async_trait]
pub trait ChatSession: Send + Sync + std::fmt::Debug {
    /// Send one user message and return the reply text (may be empty).
    async fn send_message(&self, text: &str) -> Result<String, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_has_fixed_id() {
        let greeting = Message::greeting();
        assert_eq!(greeting.id, "0");
        assert_eq!(greeting.role, Role::Model);
        assert!(greeting.text.contains("HivePro"));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new(Role::User, "a");
        let b = Message::new(Role::User, "a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), r#""model""#);
    }

    #[test]
    fn test_session_unavailable_message() {
        assert_eq!(ChatError::SessionUnavailable.to_string(), "Chat not initialized");
    }
}
