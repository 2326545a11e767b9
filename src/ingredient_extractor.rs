use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use tracing::{debug, info};

use crate::api_connection::endpoints::{
    first_choice_text, ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl,
};
use crate::api_connection::ChatBackend;
use crate::error::{FinderError, Result};

pub const IMAGE_ANALYSIS_PROMPT: &str = "Analyze this image and identify all visible food ingredients. \
Return only the ingredient names as a comma-separated list. \
Be specific (e.g., \"cherry tomatoes\" not just \"tomatoes\"). \
If you see packaged items, identify the ingredient inside. \
Focus only on raw ingredients that can be used for cooking.";

const IMAGE_MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageMediaType {
    /// Parses a declared media type. A blank declaration means JPEG.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "" | "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let guess = mime_guess::from_path(path).first()?;
        Self::from_mime(guess.essence_str())
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// Raw upload as received at the boundary.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            FinderError::InvalidInput(format!("Could not read image {}: {}", path.display(), e))
        })?;
        let media_type = ImageMediaType::from_path(path).ok_or_else(|| {
            FinderError::InvalidInput(format!("Unsupported image type: {}", path.display()))
        })?;
        Ok(Self::new(bytes, media_type.as_mime()))
    }

    fn media_type(&self) -> Result<ImageMediaType> {
        ImageMediaType::from_mime(&self.mime_type).ok_or_else(|| {
            FinderError::InvalidInput(format!("Unsupported image type: {}", self.mime_type))
        })
    }
}

/// Splits a comma-separated model reply into trimmed, non-empty names.
pub fn parse_ingredient_list(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_image_request(image: &ImagePayload, model: &str) -> Result<ChatCompletionRequest> {
    let media_type = image.media_type()?;
    let data_url = format!(
        "data:{};base64,{}",
        media_type.as_mime(),
        general_purpose::STANDARD.encode(&image.bytes)
    );

    Ok(ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: IMAGE_ANALYSIS_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        ])],
        temperature: None,
        max_tokens: Some(IMAGE_MAX_TOKENS),
    })
}

/// Single attempt, no retry. An unconfigured backend or an empty image is
/// rejected before any request is built.
pub async fn extract_ingredients<B: ChatBackend + ?Sized>(
    backend: &B,
    image: &ImagePayload,
    model: &str,
) -> Result<Vec<String>> {
    if !backend.is_configured() {
        return Err(FinderError::Unconfigured);
    }
    if image.bytes.is_empty() {
        return Err(FinderError::InvalidInput("No image provided".to_string()));
    }

    let request = build_image_request(image, model)?;
    debug!(bytes = image.bytes.len(), mime = %image.mime_type, "analyzing image");

    let response = backend.call_chat_completion(request).await?;
    let reply = first_choice_text(&response);
    let ingredients = parse_ingredient_list(&reply);
    info!(count = ingredients.len(), "ingredients detected in image");
    Ok(ingredients)
}
