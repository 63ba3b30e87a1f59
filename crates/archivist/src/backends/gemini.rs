/// Gemini API backend
///
/// Video jobs run as long-running operations on the Veo models
/// (`:predictLongRunning`, then `GET` on the operation name). Frame analysis
/// uses `:generateContent` with an inline image part.
use super::{BackendType, VideoBackend};
use crate::anchors::ImageAnchor;
use crate::captioning::{Caption, CaptionProvider};
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::job::{JobHandle, RemoteError};
use crate::request::VideoRequest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API backend
pub struct GeminiBackend {
    api_base: String,
    video_model: String,
    caption_model: String,
    credentials: Arc<dyn CredentialStore>,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create new Gemini backend
    pub fn new(config: &AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("building HTTP client")?;

        Ok(Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            video_model: config.video_model.clone(),
            caption_model: config.caption_model.clone(),
            credentials,
            client,
        })
    }

    fn api_key(&self) -> Result<String> {
        self.credentials
            .current()
            .context("no API key selected")
    }

    fn model_endpoint(&self, model: &str, method: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:{}", self.api_base, model_path, method)
    }

    fn operation_endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_base, name.trim_start_matches('/'))
    }
}

/// Fail on a non-success status, surfacing the API's error message
async fn check_response(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{}: {} - {}", what, status, error_message(&body))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn inline_image(anchor: &ImageAnchor) -> InlineImage {
    InlineImage {
        bytes_base64_encoded: anchor.to_base64(),
        mime_type: anchor.mime_type().to_string(),
    }
}

fn predict_request(request: &VideoRequest) -> PredictRequest {
    PredictRequest {
        instances: vec![VideoInstance {
            prompt: request.prompt.clone(),
            image: request.start_image.as_ref().map(inline_image),
            last_frame: request.end_image.as_ref().map(inline_image),
        }],
        parameters: VideoParameters {
            aspect_ratio: request.aspect_ratio.as_str().to_string(),
            resolution: request.resolution.as_str().to_string(),
            sample_count: request.output_count,
        },
    }
}

impl From<Operation> for JobHandle {
    fn from(op: Operation) -> Self {
        let result_uri = op
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
            .filter(|uri| !uri.is_empty());

        JobHandle {
            name: op.name,
            done: op.done,
            result_uri,
            error: op.error.map(|e| RemoteError {
                code: e.code,
                message: e.message,
            }),
        }
    }
}

#[async_trait::async_trait]
impl VideoBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Gemini
    }

    async fn is_available(&self) -> Result<bool> {
        let Ok(key) = self.api_key() else {
            return Ok(false);
        };
        let url = format!(
            "{}/models/{}",
            self.api_base,
            self.video_model.trim().trim_start_matches("models/")
        );
        match self
            .client
            .get(url)
            .header("x-goog-api-key", key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn submit(&self, request: &VideoRequest) -> Result<JobHandle> {
        let key = self.api_key()?;
        let body = predict_request(request);
        tracing::debug!(
            "Submitting {} request to {} ({} {})",
            request.shape,
            request.model,
            request.aspect_ratio,
            request.resolution.as_str()
        );

        let response = self
            .client
            .post(self.model_endpoint(&request.model, "predictLongRunning"))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .context("sending video request")?;
        let response = check_response(response, "Gemini API error").await?;

        let operation: Operation = response.json().await.context("decoding operation")?;
        Ok(operation.into())
    }

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(self.operation_endpoint(&handle.name))
            .header("x-goog-api-key", key)
            .send()
            .await
            .context("polling operation")?;
        let response = check_response(response, "Failed to get operation").await?;

        let operation: Operation = response.json().await.context("decoding operation")?;
        Ok(operation.into())
    }

    async fn fetch_asset(&self, locator: &str) -> Result<Vec<u8>> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(locator)
            .query(&[("key", key)])
            .send()
            .await
            .context("downloading video")?;
        let response = check_response(response, "Download failed").await?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl CaptionProvider for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn caption(&self, image: &ImageAnchor, instruction: &str) -> Result<Caption> {
        let key = self.api_key()?;
        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": instruction },
                    { "inlineData": { "mimeType": image.mime_type(), "data": image.to_base64() } }
                ]
            }]
        });

        let response = self
            .client
            .post(self.model_endpoint(&self.caption_model, "generateContent"))
            .header("x-goog-api-key", key)
            .json(&payload)
            .send()
            .await
            .context("sending caption request")?;
        let response = check_response(response, "Gemini API error").await?;

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(Caption {
            text: parsed.text(),
            provider: "gemini".to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: String,
    resolution: String,
    sample_count: u32,
}

/// Long-running operation as returned by create and get
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<OperationResponse>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}
