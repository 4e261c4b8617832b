use thiserror::Error;

pub const STORAGE_FULL_MESSAGE: &str =
    "Storage is full. Please clear some history to save new items.";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded ({needed} bytes requested, quota is {quota} bytes)")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Everything a studio operation can surface to the person driving it.
///
/// The display string is what the front-end shows in its error banner, so
/// variants carry the final user-facing wording.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Busy(String),
    #[error("Model responded with text instead of an image: \"{0}\"")]
    ModelReturnedText(String),
    #[error("Image generation failed. The model did not return a valid image.")]
    NoImageReturned,
    #[error("{0}")]
    EmptyResponse(String),
    #[error("{0}")]
    Api(String),
    #[error("{}", STORAGE_FULL_MESSAGE)]
    StorageFull,
    #[error("{0}")]
    Storage(StorageError),
    #[error("{0}")]
    Codec(String),
    #[error("History item '{0}' not found.")]
    UnknownHistoryItem(String),
}

impl StudioError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Self::ModelReturnedText(_) | Self::NoImageReturned | Self::EmptyResponse(_) | Self::Api(_)
        )
    }
}

impl From<StorageError> for StudioError {
    fn from(err: StorageError) -> Self {
        if err.is_quota_exceeded() {
            Self::StorageFull
        } else {
            Self::Storage(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StorageError, StudioError, STORAGE_FULL_MESSAGE};

    #[test]
    fn quota_errors_map_to_storage_full() {
        let err = StudioError::from(StorageError::QuotaExceeded {
            needed: 10,
            quota: 5,
        });
        assert!(matches!(err, StudioError::StorageFull));
        assert_eq!(err.to_string(), STORAGE_FULL_MESSAGE);
    }

    #[test]
    fn model_text_is_quoted_in_message() {
        let err = StudioError::ModelReturnedText("busy".to_string());
        assert_eq!(
            err.to_string(),
            "Model responded with text instead of an image: \"busy\""
        );
        assert!(err.is_api());
    }
}
