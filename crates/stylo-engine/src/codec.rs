use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use stylo_contracts::images::{is_accepted_mime, mime_for_path, UploadedImage};
use stylo_contracts::StudioError;

pub const THUMBNAIL_MAX_WIDTH: u32 = 200;
pub const PREVIEW_MAX_WIDTH: u32 = 1024;
pub const JPEG_QUALITY: u8 = 80;

/// Scaled copies of a freshly generated image, ready for the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedImages {
    pub thumbnail: String,
    pub preview: String,
    pub width: u32,
    pub height: u32,
}

/// Drops a `data:<mime>;base64,` header if present.
pub fn strip_data_url_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("data:") {
        return trimmed;
    }
    match trimmed.split_once(',') {
        Some((_, payload)) => payload,
        None => trimmed,
    }
}

pub fn decode_file_to_base64(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    if bytes.starts_with(b"data:") {
        let text = String::from_utf8_lossy(&bytes);
        return Ok(strip_data_url_prefix(&text).to_string());
    }
    Ok(BASE64.encode(bytes))
}

/// Reads a PNG, JPEG or WEBP file for the session. The type is sniffed from
/// the content, then the extension.
pub fn load_uploaded_image(path: &Path) -> Result<UploadedImage> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let sniffed = image::guess_format(&bytes)
        .ok()
        .map(|format| format.to_mime_type());
    let mime = sniffed
        .or_else(|| mime_for_path(path))
        .filter(|mime| is_accepted_mime(mime))
        .ok_or_else(|| {
            StudioError::codec(format!(
                "Unsupported image type for {}: expected PNG, JPEG or WEBP.",
                path.display()
            ))
        })?;
    Ok(UploadedImage::new(BASE64.encode(&bytes), mime).with_source(path))
}

pub fn decode_payload_bytes(base64: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(strip_data_url_prefix(base64).as_bytes())
        .map_err(|err| StudioError::codec(format!("Image payload is not valid base64: {err}")).into())
}

pub fn decode_image(base64: &str, mime_type: &str) -> Result<DynamicImage> {
    let bytes = decode_payload_bytes(base64)?;
    let decoded = match ImageFormat::from_mime_type(mime_type) {
        Some(format) => image::load_from_memory_with_format(&bytes, format)
            .or_else(|_| image::load_from_memory(&bytes)),
        None => image::load_from_memory(&bytes),
    };
    decoded.map_err(|err| StudioError::codec(format!("Failed to load image for resizing: {err}")).into())
}

/// Width is capped at `max_width` and never grows; height follows the
/// source aspect ratio, truncated. Callers reject a zero `max_width`.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let new_width = width.min(max_width).max(1);
    if width == 0 {
        return (new_width, height.max(1));
    }
    let new_height = u64::from(new_width) * u64::from(height) / u64::from(width);
    (new_width, (new_height as u32).max(1))
}

pub fn resize_to_base64(base64: &str, mime_type: &str, max_width: u32) -> Result<String> {
    let image = decode_image(base64, mime_type)?;
    encode_scaled_jpeg(&image, max_width)
}

/// Decodes once and produces the thumbnail and preview.
pub fn derive_history_images(base64: &str, mime_type: &str) -> Result<DerivedImages> {
    let image = decode_image(base64, mime_type)?;
    Ok(DerivedImages {
        thumbnail: encode_scaled_jpeg(&image, THUMBNAIL_MAX_WIDTH)?,
        preview: encode_scaled_jpeg(&image, PREVIEW_MAX_WIDTH)?,
        width: image.width(),
        height: image.height(),
    })
}

fn encode_scaled_jpeg(image: &DynamicImage, max_width: u32) -> Result<String> {
    if max_width == 0 {
        return Err(StudioError::codec("Maximum width must be at least 1 pixel.").into());
    }
    let (width, height) = scaled_dimensions(image.width(), image.height(), max_width);
    let resized = if (width, height) == (image.width(), image.height()) {
        flatten_onto_white(image)
    } else {
        flatten_onto_white(&image.resize_exact(width, height, FilterType::Triangle))
    };
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&resized)
        .map_err(|err| StudioError::codec(format!("Failed to encode resized image: {err}")))?;
    Ok(BASE64.encode(bytes))
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(x, y, image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}

#[cfg(test)]
mod tests {
    use std::fs;

    use stylo_contracts::StudioError;

    use super::*;
    use crate::test_support::png_base64;

    fn dimensions(base64: &str) -> anyhow::Result<(u32, u32)> {
        let image = decode_image(base64, "image/jpeg")?;
        Ok((image.width(), image.height()))
    }

    #[test]
    fn scaled_dimensions_never_upscale() {
        assert_eq!(scaled_dimensions(2000, 1000, 200), (200, 100));
        assert_eq!(scaled_dimensions(150, 300, 200), (150, 300));
        assert_eq!(scaled_dimensions(1024, 1024, 1024), (1024, 1024));
        assert_eq!(scaled_dimensions(4000, 1, 200), (200, 1));
        assert_eq!(scaled_dimensions(640, 360, 200), (200, 112));
    }

    #[test]
    fn zero_max_width_is_rejected() -> anyhow::Result<()> {
        let source = png_base64(64, 32)?;
        let err = resize_to_base64(&source, "image/png", 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::Codec(_))
        ));
        Ok(())
    }

    #[test]
    fn resize_bounds_width_and_keeps_ratio() -> anyhow::Result<()> {
        let source = png_base64(640, 360)?;
        let resized = resize_to_base64(&source, "image/png", 200)?;
        let (width, height) = dimensions(&resized)?;
        assert_eq!(width, 200);
        assert_eq!(height, 112);
        Ok(())
    }

    #[test]
    fn resize_leaves_narrow_images_at_original_width() -> anyhow::Result<()> {
        let source = png_base64(120, 80)?;
        let resized = resize_to_base64(&source, "image/png", 1024)?;
        assert_eq!(dimensions(&resized)?, (120, 80));
        Ok(())
    }

    #[test]
    fn derive_history_images_produces_both_bounds() -> anyhow::Result<()> {
        let source = png_base64(1600, 900)?;
        let derived = derive_history_images(&source, "image/png")?;
        assert_eq!((derived.width, derived.height), (1600, 900));
        assert_eq!(dimensions(&derived.thumbnail)?.0, THUMBNAIL_MAX_WIDTH);
        assert_eq!(dimensions(&derived.preview)?.0, PREVIEW_MAX_WIDTH);
        Ok(())
    }

    #[test]
    fn undecodable_payload_is_codec_error() {
        let err = resize_to_base64("bm90IGFuIGltYWdl", "image/png", 200).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::Codec(_))
        ));
        let err = resize_to_base64("%%%", "image/png", 200).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::Codec(_))
        ));
    }

    #[test]
    fn data_url_header_is_stripped() -> anyhow::Result<()> {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url_prefix("QUJD"), "QUJD");

        let temp = tempfile::tempdir()?;
        let path = temp.path().join("payload.txt");
        fs::write(&path, "data:image/png;base64,QUJD")?;
        assert_eq!(decode_file_to_base64(&path)?, "QUJD");

        let raw = temp.path().join("raw.bin");
        fs::write(&raw, b"ABC")?;
        assert_eq!(decode_file_to_base64(&raw)?, "QUJD");
        assert!(decode_file_to_base64(&temp.path().join("missing")).is_err());
        Ok(())
    }

    #[test]
    fn load_uploaded_image_sniffs_and_rejects() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let png = temp.path().join("product.dat");
        fs::write(&png, decode_payload_bytes(&png_base64(8, 8)?)?)?;
        let loaded = load_uploaded_image(&png)?;
        assert_eq!(loaded.mime_type, "image/png");
        assert_eq!(loaded.source.as_deref(), Some(png.as_path()));

        let text = temp.path().join("notes.txt");
        fs::write(&text, "hello")?;
        let err = load_uploaded_image(&text).unwrap_err();
        assert!(err.to_string().contains("Unsupported image type"));
        Ok(())
    }
}
