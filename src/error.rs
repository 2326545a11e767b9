//! Failures surfaced by the ingredient-to-recipe pipeline.
//!
//! A garbled recipe reply is not in here: it degrades to an empty result
//! inside [`crate::recipe_parser`] and is never reported as a failure.

use thiserror::Error;

use crate::api_connection::ApiConnectionError;

pub type Result<T> = std::result::Result<T, FinderError>;

#[derive(Debug, Error)]
pub enum FinderError {
    /// The model credential is missing or still the placeholder.
    #[error("model API key not configured")]
    Unconfigured,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model call itself failed. Carries the upstream message.
    #[error("upstream model call failed: {0}")]
    UpstreamFailure(String),
}

impl FinderError {
    /// Status indicator for the request/response boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            FinderError::Unconfigured => 503,
            FinderError::InvalidInput(_) => 400,
            FinderError::UpstreamFailure(_) => 502,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            FinderError::Unconfigured => {
                "The recipe service is not configured. Set OPENAI_API_KEY and try again.".to_string()
            }
            FinderError::InvalidInput(reason) => reason.clone(),
            FinderError::UpstreamFailure(_) => {
                "The recipe service could not be reached. Please try again.".to_string()
            }
        }
    }
}

/// A failure while detecting ingredients in a photo. Shown to the user with
/// a pointer to manual entry instead of the generic message.
#[derive(Debug, Error)]
#[error("image analysis failed: {0}")]
pub struct ImageAnalysisError(#[source] pub FinderError);

pub const IMAGE_FALLBACK_MESSAGE: &str =
    "Failed to analyze image. Please try again or enter ingredients manually.";

impl ImageAnalysisError {
    pub fn status_code(&self) -> u16 {
        self.0.status_code()
    }

    pub fn user_message(&self) -> String {
        match &self.0 {
            FinderError::UpstreamFailure(_) => IMAGE_FALLBACK_MESSAGE.to_string(),
            FinderError::InvalidInput(reason) => {
                format!("{} You can also enter ingredients manually.", reason)
            }
            FinderError::Unconfigured => format!(
                "{} You can still enter ingredients manually.",
                FinderError::Unconfigured.user_message()
            ),
        }
    }
}

impl From<ApiConnectionError> for FinderError {
    fn from(err: ApiConnectionError) -> Self {
        match err {
            ApiConnectionError::MissingApiKey(_) => FinderError::Unconfigured,
            other => FinderError::UpstreamFailure(other.to_string()),
        }
    }
}
