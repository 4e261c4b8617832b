use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stylo_contracts::history::DEFAULT_STORAGE_QUOTA_BYTES;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime settings, read from the environment and overridable by flags.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub image_model: Option<String>,
    pub text_model: Option<String>,
    /// `None` means requests may block indefinitely.
    pub request_timeout: Option<Duration>,
    pub home: PathBuf,
    pub storage_quota: Option<usize>,
    pub events_path: Option<PathBuf>,
}

impl StudioConfig {
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            image_model: None,
            text_model: None,
            request_timeout: None,
            home: home.into(),
            storage_quota: Some(DEFAULT_STORAGE_QUOTA_BYTES),
            events_path: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let home = value("STYLO_HOME")
            .map(PathBuf::from)
            .or_else(|| value("HOME").map(|home| Path::new(&home).join(".stylo")))
            .unwrap_or_else(|| PathBuf::from(".stylo"));
        let mut config = Self::for_home(home);

        if let Some(api_base) = value("GEMINI_API_BASE") {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        config.api_key = value("GEMINI_API_KEY").or_else(|| value("GOOGLE_API_KEY"));
        config.image_model = value("STYLO_IMAGE_MODEL");
        config.text_model = value("STYLO_TEXT_MODEL");
        config.request_timeout = value("STYLO_REQUEST_TIMEOUT").and_then(|raw| parse_timeout(&raw));
        if let Some(raw) = value("STYLO_STORAGE_QUOTA") {
            config.storage_quota = parse_quota(&raw).unwrap_or(config.storage_quota);
        }
        config.events_path = value("STYLO_EVENTS").map(PathBuf::from);
        config
    }

    pub fn history_dir(&self) -> PathBuf {
        self.home.join("storage")
    }

    pub fn events_path(&self) -> PathBuf {
        self.events_path
            .clone()
            .unwrap_or_else(|| self.home.join("events.jsonl"))
    }
}

/// Seconds; zero or negative disables the timeout.
pub fn parse_timeout(raw: &str) -> Option<Duration> {
    let seconds = raw.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds))
}

/// Bytes, or `none`/`0` for unlimited. `None` when `raw` is not understood.
pub fn parse_quota(raw: &str) -> Option<Option<usize>> {
    let normalized = raw.trim().to_ascii_lowercase();
    if matches!(normalized.as_str(), "none" | "unlimited" | "0") {
        return Some(None);
    }
    normalized.parse::<usize>().ok().map(Some)
}
