//! Image preparation: photo bytes → downscaled base64 JPEG.
//!
//! Phone photos of labels are large and often PNG/HEIC-sized. The model only
//! needs the label legible, so the image is scaled so its longest edge fits
//! `max_dimension` (aspect ratio kept, never upscaled) and re-encoded as JPEG
//! at `jpeg_quality`. JPEG is fine here: a label photo is already a lossy
//! camera image, unlike a crisp rendered page.

use crate::config::AnalysisConfig;
use crate::error::WineLabelError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::debug;

/// Media type of every image this module produces.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// An image ready to be attached to a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
    /// e.g. `image/jpeg`.
    pub media_type: String,
}

impl PreparedImage {
    /// Wrap a payload that is already base64-encoded, such as the body of an
    /// inbound HTTP request.
    pub fn from_base64(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }
}

/// Decode, downscale and re-encode image bytes.
///
/// Fails with [`WineLabelError::ImageDecode`] when the bytes are not an
/// image; there is no retry.
pub fn prepare_image(bytes: &[u8], config: &AnalysisConfig) -> Result<PreparedImage, WineLabelError> {
    prepare(bytes, config.max_dimension, config.jpeg_quality)
}

fn prepare(bytes: &[u8], max_dimension: u32, quality: u8) -> Result<PreparedImage, WineLabelError> {
    let img = image::load_from_memory(bytes).map_err(|e| WineLabelError::ImageDecode {
        detail: e.to_string(),
    })?;
    let (width, height) = img.dimensions();

    let img = downscale(img, max_dimension);
    let (out_w, out_h) = img.dimensions();

    let jpeg = encode_jpeg(&img, quality)?;
    let data = STANDARD.encode(&jpeg);
    debug!(
        "Prepared image {}x{} → {}x{}, {} bytes JPEG, {} bytes base64",
        width,
        height,
        out_w,
        out_h,
        jpeg.len(),
        data.len()
    );

    Ok(PreparedImage {
        data,
        media_type: JPEG_MEDIA_TYPE.to_string(),
    })
}

/// Read an image file and prepare it.
///
/// Decoding and resizing are CPU-bound, so they run on the blocking pool.
pub async fn prepare_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<PreparedImage, WineLabelError> {
    let path = path.as_ref().to_path_buf();
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WineLabelError::FileNotFound { path: path.clone() }
        } else {
            WineLabelError::ReadFailed {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    let (max_dimension, quality) = (config.max_dimension, config.jpeg_quality);
    tokio::task::spawn_blocking(move || prepare(&bytes, max_dimension, quality))
        .await
        .map_err(|e| WineLabelError::Internal(format!("prepare task panicked: {e}")))?
}

/// Scale so the longest edge is at most `max_dimension`.
fn downscale(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let max_dimension = max_dimension.max(1);
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension {
        return img;
    }

    let scale = max_dimension as f64 / longest as f64;
    let target_w = ((width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let target_h = ((height as f64 * scale).round() as u32).clamp(1, max_dimension);
    img.resize_exact(target_w, target_h, FilterType::CatmullRom)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, WineLabelError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| WineLabelError::ImageEncode {
            detail: e.to_string(),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([120, 20, 40, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    fn decoded_dims(prepared: &PreparedImage) -> (u32, u32) {
        let bytes = STANDARD.decode(&prepared.data).expect("valid base64");
        image::load_from_memory(&bytes).expect("valid jpeg").dimensions()
    }

    #[test]
    fn downscales_landscape_keeping_aspect() {
        let config = AnalysisConfig::default();
        let prepared = prepare_image(&png_bytes(2560, 1280), &config).unwrap();
        assert_eq!(prepared.media_type, "image/jpeg");
        assert_eq!(decoded_dims(&prepared), (1280, 640));
    }

    #[test]
    fn downscales_portrait() {
        let config = AnalysisConfig::builder().max_dimension(300).build().unwrap();
        let prepared = prepare_image(&png_bytes(600, 1200), &config).unwrap();
        assert_eq!(decoded_dims(&prepared), (150, 300));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let config = AnalysisConfig::default();
        let prepared = prepare_image(&png_bytes(40, 30), &config).unwrap();
        assert_eq!(decoded_dims(&prepared), (40, 30));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = prepare_image(b"definitely not an image", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, WineLabelError::ImageDecode { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = prepare_file("/no/such/label.jpg", &AnalysisConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WineLabelError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn prepares_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        std::fs::write(&path, png_bytes(64, 64)).unwrap();
        let prepared = prepare_file(&path, &AnalysisConfig::default()).await.unwrap();
        assert_eq!(decoded_dims(&prepared), (64, 64));
    }
}
