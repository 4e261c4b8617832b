use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use stylo_contracts::images::ImagePayload;
use stylo_contracts::models::{ModelSelector, CAPABILITY_IMAGE_EDIT, CAPABILITY_VISION_TEXT};
use stylo_contracts::options::SceneOptions;
use stylo_contracts::StudioError;

use crate::config::StudioConfig;
use crate::prompts;

/// One `generateContent` round trip. Implementations must not retry.
pub trait GenerationTransport: Send + Sync {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value>;
}

pub struct HttpTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl HttpTransport {
    /// `timeout: None` leaves requests unbounded.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.clone() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        Self::new(&config.api_base, api_key, config.request_timeout)
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerationTransport for HttpTransport {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub prompt: String,
    pub product: ImagePayload,
    pub reference: Option<ImagePayload>,
    pub scene: SceneOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub base64: String,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn payload(&self) -> ImagePayload {
        ImagePayload {
            base64: self.base64.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Narrow operations over a multimodal model. Each call is a single request;
/// nothing is retried or streamed.
pub struct GenerationClient {
    transport: Box<dyn GenerationTransport>,
    image_model: String,
    text_model: String,
}

impl GenerationClient {
    pub fn new(
        transport: impl GenerationTransport + 'static,
        image_model: impl Into<String>,
        text_model: impl Into<String>,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            image_model: image_model.into(),
            text_model: text_model.into(),
        }
    }

    /// Resolves the configured model names against the registry. Returned
    /// strings describe any fallback that happened.
    pub fn from_config(
        config: &StudioConfig,
        transport: impl GenerationTransport + 'static,
    ) -> Result<(Self, Vec<String>)> {
        let selector = ModelSelector::new(None);
        let mut warnings = Vec::new();
        let image = selector
            .select(config.image_model.as_deref(), CAPABILITY_IMAGE_EDIT)
            .map_err(anyhow::Error::msg)?;
        let text = selector
            .select(config.text_model.as_deref(), CAPABILITY_VISION_TEXT)
            .map_err(anyhow::Error::msg)?;
        warnings.extend(image.fallback_reason);
        warnings.extend(text.fallback_reason);
        Ok((
            Self::new(transport, image.model.name, text.model.name),
            warnings,
        ))
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn edit_image(&self, request: &EditRequest) -> Result<GeneratedImage> {
        let payload = build_edit_payload(request);
        let response = self
            .transport
            .generate_content(&self.image_model, &payload)?;
        extract_generated_image(&response)
    }

    pub fn describe_reference_image(&self, image: &ImagePayload) -> Result<String> {
        self.ask_for_text(
            image,
            prompts::DESCRIBE_REFERENCE_INSTRUCTION,
            "Failed to generate prompt from the reference image.",
        )
    }

    pub fn generate_mood_prompt(&self, image: &ImagePayload, mood: &str) -> Result<String> {
        self.ask_for_text(
            image,
            &prompts::mood_instruction(mood),
            "Failed to generate magic prompt.",
        )
    }

    pub fn suggest_product_prompt(&self, image: &ImagePayload) -> Result<String> {
        self.ask_for_text(
            image,
            prompts::SUGGEST_PRODUCT_INSTRUCTION,
            "Failed to analyze product color.",
        )
    }

    fn ask_for_text(&self, image: &ImagePayload, instruction: &str, failure: &str) -> Result<String> {
        let payload = build_text_payload(image, instruction);
        let response = self.transport.generate_content(&self.text_model, &payload)?;
        match extract_response_text(&response) {
            Some(text) => Ok(text),
            None => Err(StudioError::EmptyResponse(failure.to_string()).into()),
        }
    }
}

pub fn image_part(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.base64,
        }
    })
}

/// `[reference?, product, instruction]`.
pub fn build_edit_parts(request: &EditRequest) -> Vec<Value> {
    let scene = &request.scene;
    let mut parts = Vec::new();
    let instruction = if let Some(reference) = request.reference.as_ref() {
        parts.push(image_part(reference));
        prompts::edit_with_reference_instruction(
            &request.prompt,
            &scene.aspect_ratio,
            &scene.lighting_style,
            &scene.camera_perspective,
        )
    } else {
        prompts::edit_instruction(
            &request.prompt,
            &scene.aspect_ratio,
            &scene.lighting_style,
            &scene.camera_perspective,
        )
    };
    parts.push(image_part(&request.product));
    parts.push(json!({ "text": instruction }));
    parts
}

pub fn build_edit_payload(request: &EditRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": build_edit_parts(request),
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
        },
    })
}

pub fn build_text_payload(image: &ImagePayload, instruction: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [image_part(image), { "text": instruction }],
        }],
    })
}

fn first_candidate_parts(response: &Value) -> Vec<Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn inline_data(part: &Value) -> Option<(&str, Option<&str>)> {
    let inline = part
        .get("inlineData")
        .or_else(|| part.get("inline_data"))
        .and_then(Value::as_object)?;
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())?;
    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str);
    Some((data, mime_type))
}

fn part_text(part: &Value) -> Option<&str> {
    if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    part.get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

/// First inline image of the first candidate, returned untouched. The
/// requested aspect ratio is not checked here.
pub fn extract_generated_image(response: &Value) -> Result<GeneratedImage> {
    let parts = first_candidate_parts(response);
    if let Some((data, mime_type)) = parts.iter().find_map(inline_data) {
        return Ok(GeneratedImage {
            base64: data.to_string(),
            mime_type: mime_type.unwrap_or("image/png").to_string(),
        });
    }
    if let Some(text) = parts.iter().find_map(part_text) {
        return Err(StudioError::ModelReturnedText(text.to_string()).into());
    }
    Err(StudioError::NoImageReturned.into())
}

/// Concatenated text of the first candidate, trimmed; `None` when blank.
pub fn extract_response_text(response: &Value) -> Option<String> {
    let joined = first_candidate_parts(response)
        .iter()
        .filter_map(part_text)
        .collect::<String>();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
