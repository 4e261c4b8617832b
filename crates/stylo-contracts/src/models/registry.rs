use indexmap::IndexMap;

/// Accepts image + text parts and answers with an image part.
pub const CAPABILITY_IMAGE_EDIT: &str = "image_edit";
/// Accepts image + text parts and answers with text.
pub const CAPABILITY_VISION_TEXT: &str = "vision_text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub capabilities: Vec<String>,
    pub label: String,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str], label: &str| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                label: label.to_string(),
            },
        );
    };

    insert(
        "gemini-2.5-flash-image-preview",
        &[CAPABILITY_IMAGE_EDIT],
        "Gemini 2.5 Flash Image",
    );
    insert(
        "gemini-2.5-flash",
        &[CAPABILITY_VISION_TEXT],
        "Gemini 2.5 Flash",
    );
    insert("gemini-2.5-pro", &[CAPABILITY_VISION_TEXT], "Gemini 2.5 Pro");
    insert(
        "gemini-3-pro-image-preview",
        &[CAPABILITY_IMAGE_EDIT],
        "Gemini 3 Pro Image",
    );

    map
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, CAPABILITY_IMAGE_EDIT, CAPABILITY_VISION_TEXT};

    #[test]
    fn default_registry_orders_primary_models_first() {
        let registry = ModelRegistry::default();
        assert_eq!(
            registry.by_capability(CAPABILITY_IMAGE_EDIT)[0].name,
            "gemini-2.5-flash-image-preview"
        );
        assert_eq!(
            registry.by_capability(CAPABILITY_VISION_TEXT)[0].name,
            "gemini-2.5-flash"
        );
    }

    #[test]
    fn lookup_accepts_models_prefix() {
        let registry = ModelRegistry::default();
        assert!(registry.get("models/gemini-2.5-pro").is_some());
        assert!(registry
            .ensure("gemini-2.5-pro", CAPABILITY_IMAGE_EDIT)
            .is_none());
    }
}
