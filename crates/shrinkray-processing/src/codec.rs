//! Format-specific encoders behind a single entry point.
//!
//! Callers pick behavior with an [`OutputFormat`] tag only; the encoder
//! wiring (mozjpeg, oxipng, ravif) stays private to this module.
//!
//! Quality semantics per format:
//! - JPEG: 1-100 visual quality, passed straight to the encoder.
//! - AVIF: 1-100 visual quality, passed straight to the encoder.
//! - PNG: lossless at every setting. The 50-100 knob buys compression effort
//!   (level 1-6): higher means smaller output and more CPU, never more
//!   fidelity.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use shrinkray_core::constants::{MAX_QUALITY, MIN_QUALITY};
use shrinkray_core::{OutputFormat, ProcessError};

/// AVIF effort/speed trade-off (1 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// Encode `img` in the requested format.
pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Bytes, ProcessError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessError::Encode(format!(
            "cannot encode zero-area surface ({}x{})",
            width, height
        )));
    }

    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img, quality),
        OutputFormat::Avif => encode_avif(img, quality),
    }
}

/// Map the 50-100 quality knob onto oxipng's discrete level scale (1-6).
///
/// 50 -> 1 (fastest, least compression), 100 -> 6 (slowest, smallest).
pub fn png_compression_level(quality: u8) -> u8 {
    let q = quality.clamp(MIN_QUALITY, MAX_QUALITY) as f64;
    (((q - 50.0) / 50.0) * 5.0).round() as u8 + 1
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessError> {
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality as f32);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);

    let mut comp = comp
        .start_compress(Vec::new())
        .map_err(|e| ProcessError::Encode(format!("jpeg: {}", e)))?;
    comp.write_scanlines(&rgb_img)
        .map_err(|e| ProcessError::Encode(format!("jpeg: {}", e)))?;
    let jpeg_data = comp
        .finish()
        .map_err(|e| ProcessError::Encode(format!("jpeg: {}", e)))?;

    Ok(Bytes::from(jpeg_data))
}

fn encode_png(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ProcessError::Encode(format!("png: {}", e)))?;

    let level = png_compression_level(quality);
    tracing::debug!(quality = quality, level = level, "png recompression");

    let options = oxipng::Options::from_preset(level);
    let optimized = oxipng::optimize_from_memory(&buffer, &options)
        .map_err(|e| ProcessError::Encode(format!("png: {}", e)))?;

    Ok(Bytes::from(optimized))
}

fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessError> {
    let (width, height) = img.dimensions();

    let rgb_img = img.to_rgb8();
    let rgb_data: Vec<rgb::RGB8> = rgb_img
        .as_raw()
        .chunks_exact(3)
        .map(|chunk| rgb::RGB8::new(chunk[0], chunk[1], chunk[2]))
        .collect();

    let img_buf = ravif::Img::new(rgb_data.as_slice(), width as usize, height as usize);

    let encoder = ravif::Encoder::new()
        .with_quality(quality as f32)
        .with_speed(AVIF_SPEED);

    let avif_data = encoder
        .encode_rgb(img_buf)
        .map_err(|e| ProcessError::Encode(format!("avif: {}", e)))?;

    Ok(Bytes::copy_from_slice(&avif_data.avif_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([180, 40, 90, 255]),
        ))
    }

    #[test]
    fn png_level_mapping_endpoints() {
        assert_eq!(png_compression_level(50), 1);
        assert_eq!(png_compression_level(100), 6);
    }

    #[test]
    fn png_level_mapping_is_monotonic() {
        let mut previous = 0;
        for quality in 50..=100 {
            let level = png_compression_level(quality);
            assert!(level >= previous, "quality {} gave level {}", quality, level);
            assert!((1..=6).contains(&level));
            previous = level;
        }
    }

    #[test]
    fn png_level_mapping_clamps_out_of_range_input() {
        assert_eq!(png_compression_level(0), 1);
        assert_eq!(png_compression_level(255), 6);
    }

    #[test]
    fn encode_jpeg_produces_jpeg_bytes() {
        let data = encode(&test_image(32, 24), OutputFormat::Jpeg, 80).unwrap();
        assert!(!data.is_empty());
        // SOI marker
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_png_produces_png_bytes() {
        let data = encode(&test_image(32, 24), OutputFormat::Png, 75).unwrap();
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn encode_avif_produces_avif_bytes() {
        let data = encode(&test_image(16, 16), OutputFormat::Avif, 60).unwrap();
        assert!(!data.is_empty());
        // ftyp box within the first bytes of the container
        assert_eq!(&data[4..8], b"ftyp");
    }

    #[test]
    fn encode_rejects_zero_area_surface() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        let err = encode(&img, OutputFormat::Jpeg, 80).unwrap_err();
        assert!(matches!(err, ProcessError::Encode(_)));
    }

    #[test]
    fn png_output_is_lossless_at_every_level() {
        let img = test_image(20, 20);
        for quality in [50, 75, 100] {
            let data = encode(&img, OutputFormat::Png, quality).unwrap();
            let decoded = image::load_from_memory(&data).unwrap();
            assert_eq!(decoded.to_rgba8(), img.to_rgba8());
        }
    }
}
