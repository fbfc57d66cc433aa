//! Upstream calls to the generative models, and the classification of their
//! heterogeneous responses.
//!
//! Three capabilities are consumed: an image-editing model
//! (`generateContent` with an inline image), a text-to-image model
//! (Imagen `:predict`) and a text-completion model (`generateContent`).

use crate::api::{AspectRatio, ImagePayload};
use crate::error::{Result, RetouchError};
use crate::server::config::ServerConfig;
use serde::{Deserialize, Serialize};

/// Client for the upstream generative API. Stateless across calls; all
/// session state lives with the caller.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ServerConfig,
}

/// Outcome of an image-editing call, disambiguated from the raw response.
///
/// Exactly one case applies per response; modeling them as an enum keeps
/// callers from conflating a refusal with an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// The model returned image bytes.
    Image(ImagePayload),
    /// The model explicitly refused for safety reasons; carries the signal
    /// it sent.
    SafetyBlocked(String),
    /// The model answered in prose (clarifying question, refusal text)
    /// instead of image data.
    TextOnly(String),
    /// Nothing usable in the response.
    Empty,
}

impl GeminiClient {
    /// Builds a client from the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Edits `image` according to `prompt` and classifies the response.
    pub async fn edit_image(&self, image: &ImagePayload, prompt: &str) -> Result<ModelOutcome> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.data.clone(),
                        },
                    },
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".into(), "TEXT".into()],
            }),
        };

        let response = self
            .generate_content(&self.config.edit_model, &body)
            .await?;
        Ok(classify(response))
    }

    /// Creates one PNG image from a text description at the requested
    /// aspect ratio.
    pub async fn create_image(
        &self,
        prompt: &str,
        style: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: compose_create_prompt(prompt, style),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.as_str().to_string(),
                output_mime_type: "image/png".to_string(),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:predict",
            self.config.base_url, self.config.imagen_model,
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_upstream_error(status.as_u16(), &text));
        }

        let predict: PredictResponse = response.json().await?;
        let prediction = predict
            .predictions
            .into_iter()
            .find(|p| !p.bytes_base64_encoded.is_empty())
            .ok_or_else(|| {
                RetouchError::NoImage(
                    "Could not create the image. The API did not return a valid image; \
                     try a more detailed prompt."
                        .into(),
                )
            })?;

        tracing::debug!(model = %self.config.imagen_model, "image created");
        Ok(ImagePayload {
            data: prediction.bytes_base64_encoded,
            mime_type: prediction
                .mime_type
                .unwrap_or_else(|| "image/png".to_string()),
        })
    }

    /// Summarizes the changes an edit instruction would apply, returning
    /// the model's text verbatim.
    pub async fn summarize(&self, prompt: &str, style: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart::Text {
                    text: compose_summary_prompt(prompt, style),
                }],
            }],
            generation_config: None,
        };

        let response = self
            .generate_content(&self.config.text_model, &body)
            .await?;
        let text = response.text();
        if text.is_empty() {
            return Err(RetouchError::Api {
                status: 200,
                message: "The model returned no text.".into(),
            });
        }
        Ok(text)
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, model,
        );
        tracing::debug!(model, "calling generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_upstream_error(status.as_u16(), &text));
        }

        Ok(response.json().await?)
    }
}

/// Classifies an image-editing response into exactly one outcome.
///
/// Order matters: a prompt-level block is a refusal regardless of anything
/// else; otherwise an image part wins, and only imageless responses are
/// inspected for a candidate safety signal, then for prose, before falling
/// through to [`ModelOutcome::Empty`].
pub fn classify(response: GenerateContentResponse) -> ModelOutcome {
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            return ModelOutcome::SafetyBlocked(reason.clone());
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return ModelOutcome::Empty;
    };

    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.clone()) {
        return ModelOutcome::Image(ImagePayload {
            data: inline.data,
            mime_type: inline.mime_type,
        });
    }

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(
            reason,
            "SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST"
        ) {
            return ModelOutcome::SafetyBlocked(reason.to_string());
        }
    }

    if let Some(text) = parts.iter().find_map(|p| p.text.clone()) {
        return ModelOutcome::TextOnly(text);
    }

    ModelOutcome::Empty
}

/// Composes the full text-to-image prompt with the style descriptor.
pub fn compose_create_prompt(prompt: &str, style: &str) -> String {
    format!(
        "Create an image based on the following description: \"{prompt}\". \
         The style should be {style}."
    )
}

/// Composes the one-sentence change-summary prompt.
pub fn compose_summary_prompt(prompt: &str, style: &str) -> String {
    format!(
        "Based on the following image edit request: \"{prompt}\" with a \"{style}\" style, \
         summarize the changes that would be applied in one short, descriptive sentence. \
         Example: \"Improved the lighting, changed the background to white and applied a \
         professional style.\""
    )
}

/// Maps an upstream failure body to a typed error. Safety-flavored messages
/// become refusals; everything else is relayed with its status.
fn parse_upstream_error(status: u16, body: &str) -> RetouchError {
    let message = serde_json::from_str::<UpstreamErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                format!("upstream error {status}")
            } else {
                body.to_string()
            }
        });

    let lower = message.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return RetouchError::SafetyBlocked(message);
    }
    RetouchError::Api { status, message }
}

// Wire types, camelCase per the upstream API.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's text parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorEnvelope {
    error: UpstreamError,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}
