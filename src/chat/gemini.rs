//! Google Gemini `generateContent` backend.
//!
//! Sessions keep their history client-side and resend it with every turn,
//! the same way the official SDK's chat object works. Creating a session is
//! therefore a local operation; only [`ChatSession::send_message`] touches
//! the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{ChatBackend, ChatError, ChatSession};
use crate::config::ChatSettings;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Create a backend from resolved chat settings.
    ///
    /// Fails with [`ChatError::MissingCredential`] when no key is configured.
    pub fn from_settings(settings: &ChatSettings) -> Result<Self, ChatError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ChatError::MissingCredential)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> Result<Url, ChatError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        let url = Url::parse(&base)?.join(&format!("v1beta/models/{}:generateContent", self.model))?;
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ChatBackend for GeminiBackend {
    async fn create_session(&self, system_prompt: &str) -> Result<Arc<dyn ChatSession>, ChatError> {
        let endpoint = self.endpoint()?;
        tracing::debug!(model = %self.model, endpoint = %endpoint, "Creating Gemini session");

        Ok(Arc::new(GeminiSession {
            http: self.http.clone(),
            api_key: self.api_key.clone(),
            endpoint,
            system_instruction: Content::system(system_prompt),
            history: Mutex::new(Vec::new()),
        }))
    }
}

/// One Gemini conversation.
pub struct GeminiSession {
    http: reqwest::Client,
    api_key: String,
    endpoint: Url,
    system_instruction: Content,
    history: Mutex<Vec<Content>>,
}

impl std::fmt::Debug for GeminiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSession")
            .field("endpoint", &self.endpoint.as_str())
            .field("turns", &self.history().len())
            .finish_non_exhaustive()
    }
}

impl GeminiSession {
    /// Completed turns so far (user and model contents).
    #[must_use]
    pub fn history(&self) -> Vec<Content> {
        lock(&self.history).clone()
    }
}

#[async_trait::async_trait]
impl ChatSession for GeminiSession {
    async fn send_message(&self, text: &str) -> Result<String, ChatError> {
        let user = Content::user(text);
        let mut contents = self.history();
        contents.push(user.clone());

        let body = GenerateContentRequest {
            system_instruction: &self.system_instruction,
            contents: &contents,
        };

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            let message = api_error_message(&raw).unwrap_or(raw);
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)?;
        let reply = parsed.text();

        tracing::debug!(
            prompt_length = text.len(),
            reply_length = reply.len(),
            "Gemini turn completed"
        );

        // An empty model turn would poison every later request.
        if !reply.is_empty() {
            lock(&self.history).extend([user, Content::model(&reply)]);
        }
        Ok(reply)
    }
}

/// A role-tagged list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn with_role(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::text(text)],
        }
    }

    #[must_use]
    pub fn user(text: &str) -> Self {
        Self::with_role("user", text)
    }

    #[must_use]
    pub fn model(text: &str) -> Self {
        Self::with_role("model", text)
    }

    /// System instructions carry no role.
    #[must_use]
    pub fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: &'a Content,
    contents: &'a [Content],
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Extract `error.message` from an API error body.
fn api_error_message(raw: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(raw).ok()?;
    v["error"]["message"].as_str().map(ToString::to_string)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> ChatSettings {
        ChatSettings {
            api_key: api_key.map(ToString::to_string),
            ..ChatSettings::default()
        }
    }

    #[test]
    fn test_missing_credential() {
        let err = GeminiBackend::from_settings(&settings(None)).unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));
    }

    #[test]
    fn test_endpoint() {
        let backend = GeminiBackend::from_settings(&settings(Some("k"))).unwrap();
        assert_eq!(
            backend.endpoint().unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash_and_prefix() {
        let mut s = settings(Some("k"));
        s.base_url = "http://127.0.0.1:9000/proxy/".to_string();
        let backend = GeminiBackend::from_settings(&s).unwrap();
        assert_eq!(
            backend.endpoint().unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_payload_shape() {
        let system = Content::system("Be brief.");
        let contents = vec![Content::user("Hi"), Content::model("Hello"), Content::user("Stack?")];
        let body = GenerateContentRequest {
            system_instruction: &system,
            contents: &contents,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "Stack?");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"React, "},{"text":"Rust"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text(), "React, Rust");
    }

    #[test]
    fn test_response_without_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_api_error_message() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(raw).as_deref(), Some("API key not valid."));
        assert_eq!(api_error_message("<html>"), None);
    }
}
