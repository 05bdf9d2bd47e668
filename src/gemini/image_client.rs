use base64::Engine;
use reqwest::StatusCode;

use crate::{
    config::GeminiConfig,
    error::{FailureKind, GenerationFailure, Result, StoryVisError},
    gemini::classify::classify_rejection,
    models::{GeminiGenerateRequest, GeminiGenerateResponse, GeneratedImage, GenerationRequest},
};

/// Single-shot client for the image `generateContent` endpoint.
///
/// Issues exactly one request per call and returns every failure as a
/// classified [`GenerationFailure`]. Retry policy belongs to the caller.
#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl ImageClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoryVisError::ClientError(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GeneratedImage, GenerationFailure> {
        let api_key = match self.config.usable_api_key() {
            Some(key) => key,
            None => {
                return Err(GenerationFailure::new(
                    FailureKind::CredentialMissing,
                    "no API key configured for the generation service",
                ))
            }
        };
        if request.prompt.trim().is_empty() {
            return Err(GenerationFailure::new(
                FailureKind::Unknown,
                "prompt must not be empty",
            ));
        }

        let prompt = match &self.config.style_preamble {
            Some(preamble) => format!("{} Scene: {}", preamble, request.prompt),
            None => request.prompt.clone(),
        };
        let body = GeminiGenerateRequest::for_prompt(&prompt, request.aspect_ratio);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_id,
            api_key
        );

        log::info!(
            "Generating image with model: {} ({})",
            self.config.model_id,
            request.aspect_ratio
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_failure(status, &detail));
        }

        let parsed: GeminiGenerateResponse = response.json().await.map_err(|e| {
            GenerationFailure::new(
                FailureKind::Unknown,
                format!("malformed service response: {}", e),
            )
        })?;

        extract_image(&parsed)
    }
}

/// Network-level errors, including the bounded request timeout, are
/// transient by definition.
fn transport_failure(err: reqwest::Error) -> GenerationFailure {
    let detail = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    GenerationFailure::new(FailureKind::TransientServiceError, detail)
}

fn status_failure(status: StatusCode, body: &str) -> GenerationFailure {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return GenerationFailure::new(
            FailureKind::TransientServiceError,
            format!("service returned {}: {}", status, body),
        );
    }
    GenerationFailure::new(
        classify_rejection(body),
        format!("service returned {}: {}", status, body),
    )
}

/// Scan the first candidate's parts in response order; the first inline
/// payload wins. With no payload, the accompanying text decides the failure
/// kind.
pub(crate) fn extract_image(
    response: &GeminiGenerateResponse,
) -> std::result::Result<GeneratedImage, GenerationFailure> {
    let parts = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or(&[]);

    if parts.is_empty() {
        return Err(GenerationFailure::new(
            FailureKind::Unknown,
            "response contained no content",
        ));
    }

    for part in parts {
        if let Some(inline) = &part.inline_data {
            if inline.data.is_empty() {
                continue;
            }
            let image_data = base64::engine::general_purpose::STANDARD
                .decode(&inline.data)
                .map_err(|e| {
                    GenerationFailure::new(
                        FailureKind::Unknown,
                        format!("invalid image payload: {}", e),
                    )
                })?;
            return Ok(GeneratedImage::png(image_data));
        }
    }

    let text = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    let kind = classify_rejection(&text);
    let message = if text.is_empty() {
        "response contained no image payload".to_string()
    } else {
        text
    };
    Err(GenerationFailure::new(kind, message))
}
