use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

use crate::gemini::GenerationTransport;

pub(crate) type RecordedCalls = Arc<Mutex<Vec<(String, Value)>>>;

/// Replays canned responses in order and records every request.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: RecordedCalls,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> RecordedCalls {
        self.calls.clone()
    }
}

impl GenerationTransport for ScriptedTransport {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value> {
        self.calls
            .lock()
            .map_err(|_| anyhow::anyhow!("calls lock poisoned"))?
            .push((model.to_string(), payload.clone()));
        self.responses
            .lock()
            .map_err(|_| anyhow::anyhow!("responses lock poisoned"))?
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response left")))
    }
}

pub(crate) fn png_base64(width: u32, height: u32) -> Result<String> {
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(BASE64.encode(bytes))
}

pub(crate) fn image_response(base64: &str) -> Value {
    json!({
        "candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": base64}},
        ]}}]
    })
}

pub(crate) fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    })
}
