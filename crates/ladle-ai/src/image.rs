use bytes::Bytes;
use image::ImageError;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use tracing::warn;

/// Longest side of an image sent to the provider.
pub const MAX_DIMENSION: u32 = 768;

/// JPEG re-encode quality.
pub const JPEG_QUALITY: u8 = 80;

/// Downsample and re-encode uploaded images before they go to the LLM
/// provider. Each input is handled independently: empty buffers are dropped
/// silently and a corrupt image loses only itself, never the batch.
pub fn preprocess(inputs: &[Bytes]) -> Vec<Vec<u8>> {
    inputs
        .iter()
        .filter(|buf| !buf.is_empty())
        .filter_map(|buf| match convert(buf) {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                warn!("Dropping undecodable image ({} bytes): {}", buf.len(), e);
                None
            }
        })
        .collect()
}

fn convert(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(bytes)?;

    // thumbnail() fits within the bound preserving aspect ratio and never
    // upscales smaller images.
    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.thumbnail(MAX_DIMENSION, MAX_DIMENSION)
    } else {
        img
    };

    // JPEG has no alpha channel; flatten whatever came in to RGB first.
    let img = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    #[test]
    fn large_image_is_bounded_and_jpeg() {
        let out = preprocess(&[png_bytes(1024, 512)]);
        assert_eq!(out.len(), 1);

        assert_eq!(image::guess_format(&out[0]).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out[0]).unwrap();
        assert!(decoded.width() <= MAX_DIMENSION);
        assert!(decoded.height() <= MAX_DIMENSION);
        // Aspect ratio preserved: 1024x512 fits to 768x384
        assert_eq!(decoded.width(), 768);
        assert_eq!(decoded.height(), 384);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let out = preprocess(&[png_bytes(100, 60)]);
        let decoded = image::load_from_memory(&out[0]).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 60));
    }

    #[test]
    fn empty_and_corrupt_inputs_are_dropped() {
        let inputs = vec![
            Bytes::new(),
            Bytes::from_static(b"definitely not an image"),
            png_bytes(800, 800),
        ];
        let out = preprocess(&inputs);
        assert_eq!(out.len(), 1);
    }
}
