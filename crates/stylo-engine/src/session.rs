use std::sync::Arc;

use serde_json::{json, Map, Value};
use stylo_contracts::events::{now_utc_iso, EventWriter};
use stylo_contracts::history::{new_history_id, HistoryItem, HistoryStore};
use stylo_contracts::images::{ImagePayload, UploadedImage};
use stylo_contracts::options::{parse_aspect_ratio, SceneOptions};
use stylo_contracts::StudioError;

use crate::codec;
use crate::gemini::{truncate_text, EditRequest, GenerationClient};
use crate::slot::{OperationSlot, SlotGuard};

const MISSING_PRODUCT: &str = "Please upload a product image.";
const MISSING_PROMPT: &str = "Please enter a prompt.";
const MISSING_REFERENCE: &str = "Please upload a style reference image.";
const MAGIC_NEEDS_PRODUCT: &str = "Please upload a product image first to use Magic Prompt.";
const GENERATION_BUSY: &str = "A mockup is already being generated.";
const PROCESSING_BUSY: &str = "Another prompt is already being prepared.";
/// Relative tolerance when comparing the output shape with the requested ratio.
const ASPECT_TOLERANCE: f64 = 0.02;

/// Form state plus the last rendered output. Owned by [`Session`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub product_image: Option<UploadedImage>,
    pub reference_image: Option<UploadedImage>,
    pub prompt: String,
    pub scene: SceneOptions,
    pub generated_image: Option<ImagePayload>,
    pub error: Option<String>,
    pub processing_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub item_id: String,
    pub image: ImagePayload,
    pub width: u32,
    pub height: u32,
    /// Set when the item could not be written to storage; it still sits in
    /// the in-memory history.
    pub storage_error: Option<String>,
}

/// Top-level controller: validates the form, calls the generation client and
/// files results into history.
///
/// Errors are both returned and mirrored into [`SessionState::error`] so a
/// front-end can render straight from state. A `Busy` rejection is returned
/// only and leaves state alone.
pub struct Session {
    state: SessionState,
    history: HistoryStore,
    client: GenerationClient,
    events: EventWriter,
    generating: Arc<OperationSlot>,
    processing: Arc<OperationSlot>,
}

impl Session {
    pub fn new(client: GenerationClient, history: HistoryStore, events: EventWriter) -> Self {
        events.record(
            "session_started",
            json_object(json!({
                "history_count": history.len(),
                "image_model": client.image_model(),
                "text_model": client.text_model(),
            })),
        );
        if let Some(error) = history.load_error() {
            events.record("history_load_failed", json_object(json!({ "error": error })));
        }
        Self {
            state: SessionState::default(),
            history,
            client,
            events,
            generating: OperationSlot::new("generating"),
            processing: OperationSlot::new("processing"),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_busy()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_busy()
    }

    pub fn generation_slot(&self) -> Arc<OperationSlot> {
        Arc::clone(&self.generating)
    }

    pub fn processing_slot(&self) -> Arc<OperationSlot> {
        Arc::clone(&self.processing)
    }

    pub fn set_product_image(&mut self, image: Option<UploadedImage>) {
        self.state.product_image = image;
    }

    pub fn set_reference_image(&mut self, image: Option<UploadedImage>) {
        self.state.reference_image = image;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.state.prompt = prompt.into();
    }

    pub fn set_scene(&mut self, scene: SceneOptions) {
        self.state.scene = scene;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: impl Into<String>) {
        self.state.scene.aspect_ratio = aspect_ratio.into();
    }

    pub fn set_lighting_style(&mut self, lighting_style: impl Into<String>) {
        self.state.scene.lighting_style = lighting_style.into();
    }

    pub fn set_camera_perspective(&mut self, camera_perspective: impl Into<String>) {
        self.state.scene.camera_perspective = camera_perspective.into();
    }

    /// The edit request the current form would send, if a product is loaded.
    pub fn current_request(&self) -> Option<EditRequest> {
        let product = self.state.product_image.as_ref()?;
        Some(EditRequest {
            prompt: self.state.prompt.clone(),
            product: product.payload(),
            reference: self.state.reference_image.as_ref().map(UploadedImage::payload),
            scene: self.state.scene.clone(),
        })
    }

    pub fn generate(&mut self) -> Result<GenerationOutcome, StudioError> {
        let Some(request) = self.current_request() else {
            return Err(self.fail(StudioError::validation(MISSING_PRODUCT)));
        };
        if request.prompt.trim().is_empty() {
            return Err(self.fail(StudioError::validation(MISSING_PROMPT)));
        }
        let guard = self.acquire(&self.generating, GENERATION_BUSY)?;

        self.state.error = None;
        self.events.record(
            "generation_started",
            json_object(json!({
                "model": self.client.image_model(),
                "prompt": request.prompt,
                "aspect_ratio": request.scene.aspect_ratio,
                "lighting_style": request.scene.lighting_style,
                "camera_perspective": request.scene.camera_perspective,
                "has_reference": request.reference.is_some(),
            })),
        );

        let image = match self.client.edit_image(&request) {
            Ok(image) => image,
            Err(err) => return Err(self.fail_generation(err, &guard)),
        };
        let derived = match codec::derive_history_images(&image.base64, &image.mime_type) {
            Ok(derived) => derived,
            Err(err) => return Err(self.fail_generation(err, &guard)),
        };
        self.state.generated_image = Some(image.payload());

        let created_at = now_utc_iso();
        let mut item_id = new_history_id(&created_at);
        while self.history.contains(&item_id) {
            item_id = new_history_id(&created_at);
        }
        let item = HistoryItem {
            id: item_id.clone(),
            prompt: request.prompt.clone(),
            preview_image: derived.preview,
            thumbnail: derived.thumbnail,
            product_image: request.product.clone(),
            reference_image: request.reference.clone(),
            aspect_ratio: request.scene.aspect_ratio.clone(),
            lighting_style: request.scene.lighting_style.clone(),
            camera_perspective: request.scene.camera_perspective.clone(),
            created_at,
        };
        let stored_bytes = item.stored_size();

        let storage_error = match self.history.insert(item) {
            Ok(()) => None,
            Err(err) => {
                let studio = StudioError::from(err);
                self.events.record(
                    "history_persist_failed",
                    json_object(json!({
                        "item_id": item_id,
                        "error": studio.to_string(),
                    })),
                );
                let message = studio.to_string();
                self.state.error = Some(message.clone());
                Some(message)
            }
        };
        self.history.select(&item_id);

        self.events.record(
            "history_item_created",
            json_object(json!({
                "item_id": item_id,
                "history_count": self.history.len(),
                "stored_bytes": stored_bytes,
            })),
        );
        self.events.record(
            "generation_finished",
            json_object(json!({
                "item_id": item_id,
                "elapsed_ms": guard.elapsed().as_millis() as u64,
                "width": derived.width,
                "height": derived.height,
                "aspect_ratio": request.scene.aspect_ratio,
                "aspect_ratio_honored": aspect_ratio_honored(
                    &request.scene.aspect_ratio,
                    derived.width,
                    derived.height,
                ),
            })),
        );

        Ok(GenerationOutcome {
            item_id,
            image: image.payload(),
            width: derived.width,
            height: derived.height,
            storage_error,
        })
    }

    /// Replaces the prompt with a description of the reference scene.
    pub fn use_reference_as_prompt(&mut self) -> Result<String, StudioError> {
        let Some(reference) = self.state.reference_image.as_ref().map(UploadedImage::payload) else {
            return Err(self.fail(StudioError::validation(MISSING_REFERENCE)));
        };
        self.run_processing(
            "describe_reference".to_string(),
            "Analyzing reference image...".to_string(),
            |client| client.describe_reference_image(&reference),
        )
    }

    /// Replaces the prompt with one written for `mood`.
    pub fn magic_prompt(&mut self, mood: &str) -> Result<String, StudioError> {
        let Some(product) = self.state.product_image.as_ref().map(UploadedImage::payload) else {
            return Err(self.fail(StudioError::validation(MAGIC_NEEDS_PRODUCT)));
        };
        let mood = mood.trim().to_string();
        if mood.is_empty() {
            return Err(self.fail(StudioError::validation("Please choose a mood.")));
        }
        self.run_processing(
            "magic_prompt".to_string(),
            format!("Generating '{mood}' prompt..."),
            |client| client.generate_mood_prompt(&product, &mood),
        )
    }

    /// Replaces the prompt with a photoshoot suggestion for the product.
    pub fn auto_prompt(&mut self) -> Result<String, StudioError> {
        let Some(product) = self.state.product_image.as_ref().map(UploadedImage::payload) else {
            return Err(self.fail(StudioError::validation(MISSING_PRODUCT)));
        };
        self.run_processing(
            "suggest_prompt".to_string(),
            "Analyzing product...".to_string(),
            |client| client.suggest_product_prompt(&product),
        )
    }

    /// Restores every parameter of a past generation into the form.
    pub fn select_history(&mut self, id: &str) -> Result<&HistoryItem, StudioError> {
        let Some(item) = self.history.select(id).cloned() else {
            return Err(self.fail(StudioError::UnknownHistoryItem(id.to_string())));
        };
        self.state.product_image = Some(UploadedImage::from(&item.product_image));
        self.state.reference_image = item.reference_image.as_ref().map(UploadedImage::from);
        self.state.prompt = item.prompt.clone();
        self.state.scene = item.scene();
        self.state.generated_image = Some(ImagePayload {
            base64: item.preview_image.clone(),
            mime_type: "image/jpeg".to_string(),
        });
        self.state.error = None;
        self.history
            .selected()
            .ok_or_else(|| StudioError::UnknownHistoryItem(id.to_string()))
    }

    /// Returns whether an item was removed; unknown ids are a no-op.
    pub fn delete_history(&mut self, id: &str) -> Result<bool, StudioError> {
        match self.history.remove(id) {
            Ok(removed) => {
                if removed {
                    self.events.record(
                        "history_item_deleted",
                        json_object(json!({ "item_id": id, "history_count": self.history.len() })),
                    );
                }
                Ok(removed)
            }
            Err(err) => Err(self.fail_storage(err)),
        }
    }

    /// `confirm` receives the item count and must agree before anything is
    /// removed.
    pub fn clear_history(&mut self, confirm: impl FnOnce(usize) -> bool) -> Result<bool, StudioError> {
        let count = self.history.len();
        match self.history.clear(confirm) {
            Ok(cleared) => {
                if cleared {
                    self.events.record(
                        "history_cleared",
                        json_object(json!({ "removed": count })),
                    );
                }
                Ok(cleared)
            }
            Err(err) => Err(self.fail_storage(err)),
        }
    }

    /// Back to a blank form. History is kept; only the selection is dropped.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.history.clear_selection();
    }

    fn run_processing(
        &mut self,
        operation: String,
        message: String,
        call: impl FnOnce(&GenerationClient) -> anyhow::Result<String>,
    ) -> Result<String, StudioError> {
        let guard = self.acquire(&self.processing, PROCESSING_BUSY)?;
        self.state.error = None;
        self.state.processing_message = Some(message);
        self.events.record(
            "processing_started",
            json_object(json!({ "operation": operation, "model": self.client.text_model() })),
        );

        let result = call(&self.client);
        self.state.processing_message = None;
        match result {
            Ok(prompt) => {
                self.events.record(
                    "processing_finished",
                    json_object(json!({
                        "operation": operation,
                        "elapsed_ms": guard.elapsed().as_millis() as u64,
                        "prompt_chars": prompt.chars().count(),
                    })),
                );
                self.state.prompt = prompt.clone();
                Ok(prompt)
            }
            Err(err) => {
                let studio = into_studio_error(err);
                self.events.record(
                    "processing_failed",
                    json_object(json!({ "operation": operation, "error": studio.to_string() })),
                );
                Err(self.fail(studio))
            }
        }
    }

    fn acquire(&self, slot: &Arc<OperationSlot>, busy: &str) -> Result<SlotGuard, StudioError> {
        let guard = slot.try_acquire();
        if guard.is_none() {
            self.events
                .record("operation_busy", json_object(json!({ "slot": slot.name() })));
        }
        guard.ok_or_else(|| StudioError::Busy(busy.to_string()))
    }

    fn fail_generation(&mut self, err: anyhow::Error, guard: &SlotGuard) -> StudioError {
        let studio = into_studio_error(err);
        self.events.record(
            "generation_failed",
            json_object(json!({
                "error": studio.to_string(),
                "elapsed_ms": guard.elapsed().as_millis() as u64,
            })),
        );
        self.fail(studio)
    }

    fn fail_storage(&mut self, err: stylo_contracts::StorageError) -> StudioError {
        let studio = StudioError::from(err);
        self.events.record(
            "history_persist_failed",
            json_object(json!({ "error": studio.to_string() })),
        );
        self.fail(studio)
    }

    fn fail(&mut self, err: StudioError) -> StudioError {
        self.state.error = Some(err.to_string());
        err
    }
}

/// Typed failures raised inside the engine pass through; anything else is an
/// API/transport failure described by its cause chain.
pub fn into_studio_error(err: anyhow::Error) -> StudioError {
    match err.downcast::<StudioError>() {
        Ok(studio) => studio,
        Err(other) => StudioError::Api(error_chain_text(&other, 512)),
    }
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

/// Whether `width`x`height` matches the requested `w:h` ratio. Unparseable
/// ratios are reported as honored.
pub fn aspect_ratio_honored(aspect_ratio: &str, width: u32, height: u32) -> bool {
    let Some((w, h)) = parse_aspect_ratio(aspect_ratio) else {
        return true;
    };
    if width == 0 || height == 0 {
        return false;
    }
    let wanted = f64::from(w) / f64::from(h);
    let actual = f64::from(width) / f64::from(height);
    ((actual - wanted) / wanted).abs() <= ASPECT_TOLERANCE
}

fn json_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
