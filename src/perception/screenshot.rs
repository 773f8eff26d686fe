use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::errors::{DroidClawError, DroidClawResult};

pub struct EncodedScreenshot {
    pub jpeg_bytes: Vec<u8>,
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Target size keeping the aspect ratio so the longest side is at most
/// `max_side`. Images already small enough are left alone.
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Decode a captured frame, shrink it and re-encode as base64 JPEG.
pub fn downscale_and_encode(
    src_bytes: &[u8],
    max_side: u32,
    quality: u8,
) -> DroidClawResult<EncodedScreenshot> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| DroidClawError::Perception(format!("screenshot decode: {e}")))?;
    let (w, h) = fit_within(img.width(), img.height(), max_side);

    let resized = if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut jpeg_bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg_bytes, quality))?;

    tracing::debug!(width = w, height = h, bytes = jpeg_bytes.len(), "screenshot encoded");
    Ok(EncodedScreenshot {
        image_base64: base64::engine::general_purpose::STANDARD.encode(&jpeg_bytes),
        jpeg_bytes,
        width: w,
        height: h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 120, 200, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn fit_within_preserves_aspect_and_never_upscales() {
        assert_eq!(fit_within(1080, 2400, 1024), (461, 1024));
        assert_eq!(fit_within(2400, 1080, 1024), (1024, 461));
        assert_eq!(fit_within(640, 480, 1024), (640, 480));
    }

    #[test]
    fn large_capture_is_shrunk_to_jpeg() {
        let shot = downscale_and_encode(&png(1200, 2000), 1024, 60).unwrap();
        assert_eq!(shot.height, 1024);
        assert_eq!(shot.width, 614);
        // JPEG SOI marker
        assert_eq!(&shot.jpeg_bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&shot.jpeg_bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (614, 1024));
        assert!(!shot.image_base64.is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_perception_error() {
        assert!(matches!(
            downscale_and_encode(b"not an image", 1024, 60),
            Err(DroidClawError::Perception(_))
        ));
    }
}
