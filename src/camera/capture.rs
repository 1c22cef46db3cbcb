//! Still-photo options and result types

use crate::camera::provider::EncodedImage;
use crate::camera::types::ImageType;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options for [`crate::CameraController::take_photo`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Encoder quality in `[0, 1]`; lossy formats only
    pub quality: f32,
    /// Output size relative to the preview's natural size, in `(0, 1]`
    pub scale: f32,
    /// Output format
    pub image_type: ImageType,
    /// Flip the still horizontally
    pub mirror: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 1.0,
            scale: 1.0,
            image_type: ImageType::Jpeg,
            mirror: false,
        }
    }
}

/// A captured still
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// `data:<mime>;base64,<payload>`
    pub uri: String,
    /// Base64 payload of `uri`
    pub base64: String,
    /// Encoded format
    pub image_type: ImageType,
    /// Raw encoded bytes
    #[serde(skip)]
    pub bytes: Bytes,
    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl CapturedPhoto {
    pub(crate) fn from_encoded(
        width: u32,
        height: u32,
        image_type: ImageType,
        encoded: EncodedImage,
    ) -> Self {
        let base64 = STANDARD.encode(&encoded.data);
        let uri = format!("data:{};base64,{}", encoded.mime, base64);
        Self {
            width,
            height,
            uri,
            base64,
            image_type,
            bytes: encoded.data,
            timestamp: Utc::now(),
        }
    }
}

/// Output size for a still.
///
/// `scale` must lie in `(0, 1]`; anything else (including NaN) falls back
/// to the natural size. Dimensions never drop below one pixel.
pub fn calculate_scaled_size(natural_width: u32, natural_height: u32, scale: f32) -> (u32, u32) {
    if !(scale > 0.0 && scale <= 1.0) || natural_width == 0 {
        return (natural_width, natural_height);
    }

    let width = (natural_width as f64 * scale as f64).round().max(1.0);
    let height = (natural_height as f64 * width / natural_width as f64)
        .round()
        .max(1.0);
    (width as u32, height as u32)
}

/// Clamp a quality value into `[0, 1]`, treating NaN as full quality
pub fn normalize_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        1.0
    } else {
        quality.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_one_keeps_natural_size() {
        assert_eq!(calculate_scaled_size(1280, 720, 1.0), (1280, 720));
    }

    #[test]
    fn test_scale_half() {
        assert_eq!(calculate_scaled_size(1280, 720, 0.5), (640, 360));
    }

    #[test]
    fn test_out_of_range_scale_uses_natural_size() {
        for scale in [0.0, -1.0, 1.5, f32::NAN] {
            assert_eq!(calculate_scaled_size(640, 480, scale), (640, 480), "{scale}");
        }
    }

    #[test]
    fn test_tiny_scale_keeps_one_pixel() {
        assert_eq!(calculate_scaled_size(100, 50, 0.001), (1, 1));
    }

    #[test]
    fn test_data_uri_assembly() {
        let photo = CapturedPhoto::from_encoded(
            2,
            2,
            ImageType::Png,
            EncodedImage {
                mime: "image/png".to_string(),
                data: Bytes::from_static(b"abc"),
            },
        );
        assert_eq!(photo.base64, "YWJj");
        assert_eq!(photo.uri, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_quality_clamp() {
        assert_eq!(normalize_quality(2.0), 1.0);
        assert_eq!(normalize_quality(-0.5), 0.0);
        assert_eq!(normalize_quality(f32::NAN), 1.0);
    }
}
