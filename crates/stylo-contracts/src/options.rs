use serde::{Deserialize, Serialize};

pub const ASPECT_RATIOS: &[&str] = &["1:1", "4:3", "3:4", "16:9", "9:16"];

pub const LIGHTING_STYLES: &[&str] = &[
    "Soft Studio",
    "Golden Hour",
    "Dramatic",
    "Cinematic",
    "Natural Daylight",
    "Backlit",
];

pub const CAMERA_PERSPECTIVES: &[&str] = &[
    "Eye-level",
    "High-angle",
    "Low-angle",
    "Macro Shot",
    "Dutch Angle",
    "Top-down",
];

pub const MOODS: &[&str] = &[
    "Cinematic",
    "Minimalist",
    "Vibrant & Colorful",
    "Dark & Moody",
    "Futuristic",
    "Vintage",
    "Natural & Earthy",
    "Luxurious & Elegant",
    "Playful & Whimsical",
    "Abstract & Surreal",
    "Cozy & Warm",
    "Industrial & Gritty",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOptions {
    pub aspect_ratio: String,
    pub lighting_style: String,
    pub camera_perspective: String,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: ASPECT_RATIOS[0].to_string(),
            lighting_style: LIGHTING_STYLES[0].to_string(),
            camera_perspective: CAMERA_PERSPECTIVES[0].to_string(),
        }
    }
}

/// Maps user input onto the catalogue spelling when it matches one entry
/// ignoring case and separators; otherwise keeps the trimmed free text.
pub fn canonical_choice(raw: &str, catalogue: &[&str]) -> String {
    let wanted = fold(raw);
    catalogue
        .iter()
        .find(|candidate| fold(candidate) == wanted)
        .map(|candidate| (*candidate).to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

pub fn parse_aspect_ratio(raw: &str) -> Option<(u32, u32)> {
    let (left, right) = raw.trim().split_once(':')?;
    let left = left.trim().parse::<u32>().ok()?;
    let right = right.trim().parse::<u32>().ok()?;
    if left == 0 || right == 0 {
        return None;
    }
    Some((left, right))
}

fn fold(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ':' || *ch == '&')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}
