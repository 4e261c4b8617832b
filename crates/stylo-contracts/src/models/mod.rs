mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, CAPABILITY_IMAGE_EDIT, CAPABILITY_VISION_TEXT};
pub use selectors::{ModelSelection, ModelSelector};
