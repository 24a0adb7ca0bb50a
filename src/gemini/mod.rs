//! Thin client for the Gemini `generateContent` API.
//!
//! One blocking call per interaction: no streaming, no retries, no model
//! fallback. Whatever text the model returns is handed back verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::AppError;

/// A single inline image: base64 payload plus its declared MIME type.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: String,
}

/// The boundary wrapper around the generative model.
///
/// The two text parameters are used asymmetrically by the callers: analysis
/// passes the instruction as `prompt` and leaves `input` empty, while the
/// chat path passes the user's message as `input` and leaves `prompt` empty.
/// That contract is preserved as observed and pinned by the integration
/// tests.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        input: &str,
        images: &[ImagePart],
        prompt: &str,
    ) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: ImagePart },
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Builds the part list in call order: input text, images, prompt text.
/// Empty text arguments are dropped at the wire level; the API rejects
/// empty text parts.
fn build_parts(input: &str, images: &[ImagePart], prompt: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    if !input.is_empty() {
        parts.push(Part::Text {
            text: input.to_string(),
        });
    }
    for image in images {
        parts.push(Part::InlineData {
            inline_data: image.clone(),
        });
    }
    if !prompt.is_empty() {
        parts.push(Part::Text {
            text: prompt.to_string(),
        });
    }
    parts
}

/// Joins every text part of the first candidate; the API splits long
/// responses across parts.
fn response_text(response: GenerateResponse) -> Result<String, AppError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        Err(AppError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, AppError> {
        if config.api_key.is_empty() || config.api_key.starts_with("${") {
            return Err(AppError::Config(
                "Gemini API key is not set (export GOOGLE_API_KEY or edit the config file)"
                    .to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        input: &str,
        images: &[ImagePart],
        prompt: &str,
    ) -> Result<String, AppError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: build_parts(input, images, prompt),
            }],
        };

        debug!(model = %self.model, images = images.len(), "calling generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderRejection {
                status: status.as_u16(),
                message,
            });
        }

        response_text(response.json::<GenerateResponse>().await?)
    }
}
