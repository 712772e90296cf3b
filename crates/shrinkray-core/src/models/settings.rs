//! Resize settings and the enums they are built from.
//!
//! A [`ResizeSettings`] value is an immutable snapshot for one submission
//! batch: the queue captures it at submit time and the pipeline never observes
//! later edits.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::{MAX_QUALITY, MAX_TARGET_SIZE, MIN_QUALITY, MIN_TARGET_SIZE};
use crate::error::ProcessError;

/// Output format for processed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Avif,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(anyhow::anyhow!("Invalid output format: {}", s)),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Extension for generated files, including the dot.
    pub fn file_extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::Avif => ".avif",
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Avif => write!(f, "avif"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::parse(s)
    }
}

/// How the target size was chosen: free slider or a fixed preset.
///
/// Cropping is only meaningful in preset mode; the slider path never crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeMode {
    #[default]
    Slider,
    Preset,
}

impl Display for SizeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SizeMode::Slider => write!(f, "slider"),
            SizeMode::Preset => write!(f, "preset"),
        }
    }
}

/// Fixed preset sizes (long edge, pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetSize {
    Sd,
    Hd,
    Fhd,
    Qhd,
    Uhd,
}

impl PresetSize {
    pub fn long_edge(self) -> u32 {
        match self {
            PresetSize::Sd => 640,
            PresetSize::Hd => 1280,
            PresetSize::Fhd => 1920,
            PresetSize::Qhd => 2560,
            PresetSize::Uhd => 3840,
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "sd" => Ok(PresetSize::Sd),
            "hd" => Ok(PresetSize::Hd),
            "fhd" => Ok(PresetSize::Fhd),
            "qhd" | "2k" => Ok(PresetSize::Qhd),
            "uhd" | "4k" => Ok(PresetSize::Uhd),
            _ => Err(anyhow::anyhow!("Invalid preset size: {}", s)),
        }
    }
}

/// Aspect ratios available for center cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CropAspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl CropAspectRatio {
    /// Integer (width, height) ratio pair.
    pub fn ratio(self) -> (u32, u32) {
        match self {
            CropAspectRatio::Wide => (16, 9),
            CropAspectRatio::Classic => (4, 3),
            CropAspectRatio::Square => (1, 1),
            CropAspectRatio::Portrait => (9, 16),
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "16:9" => Ok(CropAspectRatio::Wide),
            "4:3" => Ok(CropAspectRatio::Classic),
            "1:1" => Ok(CropAspectRatio::Square),
            "9:16" => Ok(CropAspectRatio::Portrait),
            _ => Err(anyhow::anyhow!("Invalid crop aspect ratio: {}", s)),
        }
    }
}

impl Display for CropAspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (w, h) = self.ratio();
        write!(f, "{}:{}", w, h)
    }
}

impl FromStr for CropAspectRatio {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CropAspectRatio::parse(s)
    }
}

/// Crop configuration. Only consulted when [`SizeMode::Preset`] is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CropSettings {
    pub enabled: bool,
    pub aspect_ratio: CropAspectRatio,
}

/// Per-batch processing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeSettings {
    /// When false, the source dimensions pass through untouched.
    pub resize_enabled: bool,
    /// Target long edge in pixels.
    pub max_size: u32,
    /// 50-100. Visual quality for lossy formats; compression effort for PNG.
    pub quality: u8,
    pub output_format: OutputFormat,
    pub size_mode: SizeMode,
    pub crop: CropSettings,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            resize_enabled: true,
            max_size: 720,
            quality: 80,
            output_format: OutputFormat::Jpeg,
            size_mode: SizeMode::Slider,
            crop: CropSettings::default(),
        }
    }
}

impl ResizeSettings {
    /// Reject out-of-range values. Used at API boundaries where a caller bug
    /// should be loud rather than silently corrected.
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.max_size < MIN_TARGET_SIZE || self.max_size > MAX_TARGET_SIZE {
            return Err(ProcessError::Geometry(format!(
                "target size {} out of range {}-{}",
                self.max_size, MIN_TARGET_SIZE, MAX_TARGET_SIZE
            )));
        }
        if self.quality < MIN_QUALITY || self.quality > MAX_QUALITY {
            return Err(ProcessError::Geometry(format!(
                "quality {} out of range {}-{}",
                self.quality, MIN_QUALITY, MAX_QUALITY
            )));
        }
        Ok(())
    }

    /// Coerce untrusted values (e.g. deserialized from a settings store) back
    /// to defaults field by field, keeping whatever is in range.
    pub fn sanitize(mut self) -> Self {
        let defaults = ResizeSettings::default();
        if self.max_size < MIN_TARGET_SIZE || self.max_size > MAX_TARGET_SIZE {
            self.max_size = defaults.max_size;
        }
        if self.quality < MIN_QUALITY || self.quality > MAX_QUALITY {
            self.quality = defaults.quality;
        }
        self
    }

    /// True when the crop step will run for these settings.
    pub fn crop_active(&self) -> bool {
        self.size_mode == SizeMode::Preset && self.crop.enabled
    }
}
