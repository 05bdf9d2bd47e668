use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StoryVisError};

/// Aspect ratios accepted by the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Tall => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Wide
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generation request. Immutable once issued.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(StoryVisError::RequestError(
                "prompt must not be empty".into(),
            ));
        }
        Ok(Self {
            prompt,
            aspect_ratio,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
}

impl ImageEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
        }
    }
}

/// A decoded image payload returned by a successful generation call.
#[derive(Clone, PartialEq)]
pub struct GeneratedImage {
    pub image_data: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl GeneratedImage {
    pub fn png(image_data: Vec<u8>) -> Self {
        Self {
            image_data,
            encoding: ImageEncoding::Png,
        }
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The payload itself is noise in logs and test output.
        f.debug_struct("GeneratedImage")
            .field("bytes", &self.image_data.len())
            .field("encoding", &self.encoding.as_str())
            .finish()
    }
}

// Wire schema for `models/{model}:generateContent`. Field casing follows the
// service; the structs stay private to the crate surface.

#[derive(Debug, Serialize)]
pub struct GeminiGenerateRequest {
    pub contents: Vec<WireContent>,
    #[serde(rename = "generationConfig")]
    pub generation_config: WireGenerationConfig,
}

impl GeminiGenerateRequest {
    pub fn for_prompt(prompt: &str, aspect_ratio: AspectRatio) -> Self {
        Self {
            contents: vec![WireContent {
                parts: vec![WirePart {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: WireGenerationConfig {
                image_config: WireImageConfig { aspect_ratio },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<WireInlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireInlineData {
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct WireGenerationConfig {
    #[serde(rename = "imageConfig")]
    pub image_config: WireImageConfig,
}

#[derive(Debug, Serialize)]
pub struct WireImageConfig {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Deserialize, Default)]
pub struct GeminiGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct WireCandidate {
    #[serde(default)]
    pub content: Option<WireContent>,
}
