//! The image processing pipeline.
//!
//! One linear pass per item: decode, optional center crop, optional fit
//! resize, encode, thumbnail. Stages never branch back; the first failure
//! aborts the run and no partial output escapes.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use shrinkray_core::constants::THUMBNAIL_SIZE;
use shrinkray_core::{ProcessError, ResizeSettings};

use crate::codec;
use crate::geometry;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Loading,
    Cropping,
    Resizing,
    Encoding,
    Thumbnail,
}

impl PipelineStage {
    /// Progress percentage reported when the stage starts.
    pub fn progress(self) -> u8 {
        match self {
            PipelineStage::Loading => 10,
            PipelineStage::Cropping => 20,
            PipelineStage::Resizing => 30,
            PipelineStage::Encoding => 50,
            PipelineStage::Thumbnail => 80,
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineStage::Loading => write!(f, "loading"),
            PipelineStage::Cropping => write!(f, "cropping"),
            PipelineStage::Resizing => write!(f, "resizing"),
            PipelineStage::Encoding => write!(f, "encoding"),
            PipelineStage::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub resized: bytes::Bytes,
    pub thumbnail: bytes::Bytes,
    pub original_width: u32,
    pub original_height: u32,
    /// Dimensions of the encoded main output.
    pub width: u32,
    pub height: u32,
    pub cropped: bool,
}

pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run the full pipeline over one input.
    ///
    /// `on_progress` receives `(percentage, stage)` milestones in stage order,
    /// ending with `(100, Thumbnail)` just before a successful return.
    /// Thumbnails are always derived from the uncropped original surface;
    /// the user's crop applies to the main output only.
    pub fn run(
        data: &[u8],
        settings: &ResizeSettings,
        mut on_progress: impl FnMut(u8, PipelineStage),
    ) -> Result<PipelineOutput, ProcessError> {
        settings.validate()?;

        on_progress(PipelineStage::Loading.progress(), PipelineStage::Loading);
        let original = decode(data)?;
        let (original_width, original_height) = original.dimensions();
        tracing::debug!(
            width = original_width,
            height = original_height,
            "decoded source image"
        );

        // Crop only applies in preset mode; `cropped` is set even when the
        // region happens to cover the whole source.
        let mut working: Option<DynamicImage> = None;
        let mut cropped = false;
        if settings.crop_active() {
            on_progress(PipelineStage::Cropping.progress(), PipelineStage::Cropping);
            let region = geometry::center_crop(
                original_width,
                original_height,
                settings.crop.aspect_ratio.ratio(),
            )?;
            tracing::debug!(
                x = region.x,
                y = region.y,
                width = region.width,
                height = region.height,
                aspect = %settings.crop.aspect_ratio,
                "applying center crop"
            );
            working = Some(original.crop_imm(region.x, region.y, region.width, region.height));
            cropped = true;
        }

        on_progress(PipelineStage::Resizing.progress(), PipelineStage::Resizing);
        let (current_width, current_height) = working
            .as_ref()
            .map(|img| img.dimensions())
            .unwrap_or((original_width, original_height));
        let (target_width, target_height) = if settings.resize_enabled {
            geometry::fit_size(current_width, current_height, settings.max_size)?
        } else {
            (current_width, current_height)
        };
        // Identical dimensions skip the resample to avoid a pointless
        // recompression-quality hit.
        if (target_width, target_height) != (current_width, current_height) {
            let source = working.as_ref().unwrap_or(&original);
            working = Some(source.resize_exact(target_width, target_height, FilterType::Lanczos3));
        }

        on_progress(PipelineStage::Encoding.progress(), PipelineStage::Encoding);
        let surface = working.as_ref().unwrap_or(&original);
        let resized = codec::encode(surface, settings.output_format, settings.quality)?;

        on_progress(PipelineStage::Thumbnail.progress(), PipelineStage::Thumbnail);
        let (thumb_width, thumb_height) =
            geometry::fit_size(original_width, original_height, THUMBNAIL_SIZE)?;
        let thumb_scaled;
        let thumb_surface = if (thumb_width, thumb_height) != (original_width, original_height) {
            thumb_scaled = original.resize_exact(thumb_width, thumb_height, FilterType::Lanczos3);
            &thumb_scaled
        } else {
            &original
        };
        let thumbnail = codec::encode(thumb_surface, settings.output_format, settings.quality)?;

        on_progress(100, PipelineStage::Thumbnail);

        Ok(PipelineOutput {
            resized,
            thumbnail,
            original_width,
            original_height,
            width: target_width,
            height: target_height,
            cropped,
        })
    }
}

fn decode(data: &[u8]) -> Result<DynamicImage, ProcessError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessError::Decode(e.to_string()))?;
    reader
        .decode()
        .map_err(|e| ProcessError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use shrinkray_core::{CropAspectRatio, CropSettings, OutputFormat, SizeMode};

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    fn slider_settings(max_size: u32) -> ResizeSettings {
        ResizeSettings {
            resize_enabled: true,
            max_size,
            quality: 80,
            output_format: OutputFormat::Jpeg,
            size_mode: SizeMode::Slider,
            crop: CropSettings::default(),
        }
    }

    #[test]
    fn resize_to_long_edge() {
        let data = png_fixture(1000, 500);
        let out = PipelineExecutor::run(&data, &slider_settings(640), |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (640, 320));
        assert_eq!((out.original_width, out.original_height), (1000, 500));
        assert!(!out.cropped);
        assert!(!out.resized.is_empty());
        assert!(!out.thumbnail.is_empty());
    }

    #[test]
    fn square_preset_crop_is_noop_then_resizes() {
        let data = png_fixture(2000, 2000);
        let settings = ResizeSettings {
            max_size: 1280,
            size_mode: SizeMode::Preset,
            crop: CropSettings {
                enabled: true,
                aspect_ratio: CropAspectRatio::Square,
            },
            ..slider_settings(1280)
        };
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (1280, 1280));
        assert!(out.cropped);
    }

    #[test]
    fn crop_then_resize_uses_cropped_dimensions() {
        let data = png_fixture(1000, 500);
        let settings = ResizeSettings {
            max_size: 640,
            size_mode: SizeMode::Preset,
            crop: CropSettings {
                enabled: true,
                aspect_ratio: CropAspectRatio::Square,
            },
            ..slider_settings(640)
        };
        // Crop 1000x500 to 500x500, then fit to 500 (within 640, no resample).
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (500, 500));
        assert!(out.cropped);
    }

    #[test]
    fn crop_ignored_in_slider_mode() {
        let data = png_fixture(1000, 500);
        let settings = ResizeSettings {
            crop: CropSettings {
                enabled: true,
                aspect_ratio: CropAspectRatio::Square,
            },
            ..slider_settings(640)
        };
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (640, 320));
        assert!(!out.cropped);
    }

    #[test]
    fn resize_disabled_passes_dimensions_through() {
        let data = png_fixture(900, 300);
        let settings = ResizeSettings {
            resize_enabled: false,
            ..slider_settings(640)
        };
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (900, 300));
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let data = png_fixture(320, 200);
        let out = PipelineExecutor::run(&data, &slider_settings(640), |_, _| {}).unwrap();
        assert_eq!((out.width, out.height), (320, 200));
    }

    #[test]
    fn thumbnail_fits_within_thumbnail_edge() {
        let data = png_fixture(1200, 300);
        let out = PipelineExecutor::run(&data, &slider_settings(640), |_, _| {}).unwrap();
        let thumb = image::load_from_memory(&out.thumbnail).unwrap();
        assert_eq!(thumb.dimensions(), (150, 38));
    }

    #[test]
    fn thumbnail_ignores_crop() {
        let data = png_fixture(1600, 900);
        let settings = ResizeSettings {
            size_mode: SizeMode::Preset,
            crop: CropSettings {
                enabled: true,
                aspect_ratio: CropAspectRatio::Portrait,
            },
            ..slider_settings(640)
        };
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert!(out.cropped);
        // Thumbnail keeps the original 16:9-ish shape, not the 9:16 crop.
        let thumb = image::load_from_memory(&out.thumbnail).unwrap();
        assert_eq!(thumb.dimensions(), (150, 84));
    }

    #[test]
    fn progress_milestones_in_stage_order() {
        let data = png_fixture(1000, 500);
        let settings = ResizeSettings {
            size_mode: SizeMode::Preset,
            crop: CropSettings {
                enabled: true,
                aspect_ratio: CropAspectRatio::Wide,
            },
            ..slider_settings(640)
        };
        let mut milestones = Vec::new();
        PipelineExecutor::run(&data, &settings, |progress, stage| {
            milestones.push((progress, stage));
        })
        .unwrap();
        assert_eq!(
            milestones,
            vec![
                (10, PipelineStage::Loading),
                (20, PipelineStage::Cropping),
                (30, PipelineStage::Resizing),
                (50, PipelineStage::Encoding),
                (80, PipelineStage::Thumbnail),
                (100, PipelineStage::Thumbnail),
            ]
        );
    }

    #[test]
    fn progress_skips_cropping_when_inactive() {
        let data = png_fixture(1000, 500);
        let mut stages = Vec::new();
        PipelineExecutor::run(&data, &slider_settings(640), |_, stage| {
            stages.push(stage);
        })
        .unwrap();
        assert!(!stages.contains(&PipelineStage::Cropping));
    }

    #[test]
    fn repeated_runs_give_identical_dimensions() {
        let data = png_fixture(1000, 500);
        let settings = slider_settings(640);
        let a = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        let b = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        assert_eq!((a.width, a.height), (b.width, b.height));
        assert_eq!(a.cropped, b.cropped);
    }

    #[test]
    fn undecodable_input_is_a_decode_error() {
        let err =
            PipelineExecutor::run(b"definitely not an image", &slider_settings(640), |_, _| {})
                .unwrap_err();
        assert!(matches!(err, ProcessError::Decode(_)));
    }

    #[test]
    fn invalid_settings_surface_as_geometry_error() {
        let data = png_fixture(100, 100);
        let settings = ResizeSettings {
            max_size: 0,
            ..slider_settings(640)
        };
        let err = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap_err();
        assert!(matches!(err, ProcessError::Geometry(_)));
    }

    #[test]
    fn png_output_round_trips_through_decoder() {
        let data = png_fixture(400, 300);
        let settings = ResizeSettings {
            output_format: OutputFormat::Png,
            ..slider_settings(200)
        };
        let out = PipelineExecutor::run(&data, &settings, |_, _| {}).unwrap();
        let decoded = image::load_from_memory(&out.resized).unwrap();
        assert_eq!(decoded.dimensions(), (200, 150));
    }
}
