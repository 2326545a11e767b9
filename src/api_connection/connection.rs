use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, Provider};
use crate::config::API_KEY_ENV_VAR;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not configured: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

/// The hosted model seen as an opaque completion function.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether a usable credential is present. Callers check this before
    /// building any request so an unconfigured backend never touches the network.
    fn is_configured(&self) -> bool;

    async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError>;
}

impl Provider {
    pub fn openai(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::OpenAi {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        match self {
            Provider::OpenAi { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }
}

#[async_trait]
impl ChatBackend for Provider {
    fn is_configured(&self) -> bool {
        match self {
            Provider::OpenAi { api_key, .. } => api_key.is_some(),
        }
    }

    async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            Provider::OpenAi { api_key, .. } => {
                let api_key = api_key
                    .as_deref()
                    .ok_or_else(|| ApiConnectionError::MissingApiKey(API_KEY_ENV_VAR.to_string()))?;

                let url = self.completions_url();
                debug!(%url, model = %request.model, "sending chat completion request");

                let response = Client::new()
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await?;

                let status = response.status();
                if status.is_success() {
                    let body = response.text().await?;
                    let chat_response = serde_json::from_str::<ChatCompletionResponse>(&body)?;
                    Ok(chat_response)
                } else {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_joins_without_double_slash() {
        let provider = Provider::openai("http://localhost:8080/v1/", None);
        assert_eq!(
            provider.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn configured_only_with_key() {
        assert!(!Provider::openai("http://x", None).is_configured());
        assert!(Provider::openai("http://x", Some("sk-1".to_string())).is_configured());
    }
}
