use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::images::ImagePayload;
use crate::options::SceneOptions;

/// One finished generation. Immutable once created and identified by `id`.
///
/// Only the downscaled preview and thumbnail of the generated image are kept;
/// the source images are stored in full so the request can be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub prompt: String,
    pub preview_image: String,
    pub thumbnail: String,
    pub product_image: ImagePayload,
    #[serde(default)]
    pub reference_image: Option<ImagePayload>,
    pub aspect_ratio: String,
    pub lighting_style: String,
    pub camera_perspective: String,
    pub created_at: String,
}

impl HistoryItem {
    pub fn scene(&self) -> SceneOptions {
        SceneOptions {
            aspect_ratio: self.aspect_ratio.clone(),
            lighting_style: self.lighting_style.clone(),
            camera_perspective: self.camera_perspective.clone(),
        }
    }

    /// Bytes this item occupies once serialized into the history slot.
    pub fn stored_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

/// Creation timestamp followed by a random suffix.
pub fn new_history_id(created_at: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{created_at}-{}", &suffix[..12])
}
