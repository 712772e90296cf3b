//! Processed results: the output record for one completed item.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::settings::{CropAspectRatio, OutputFormat};

/// Output of one successful pipeline run.
///
/// Created exactly once per item id; immutable afterwards. Removed
/// individually by user action or wholesale by a queue reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Id of the originating queue item.
    pub id: Uuid,
    pub source_name: String,
    /// Byte size of the original input file.
    pub original_bytes: u64,
    #[serde(skip)]
    pub resized: Bytes,
    #[serde(skip)]
    pub thumbnail: Bytes,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub cropped: bool,
    /// Present only when a crop was applied.
    pub crop_aspect_ratio: Option<CropAspectRatio>,
    pub output_format: OutputFormat,
    pub resize_enabled: bool,
    pub max_size: u32,
    pub quality: u8,
}

impl ProcessedResult {
    /// Suggested file name for the resized output:
    /// original stem + applied size + format extension.
    pub fn output_file_name(&self) -> String {
        format!(
            "{}_{}px{}",
            file_stem(&self.source_name),
            self.max_size,
            self.output_format.file_extension()
        )
    }

    /// Suggested file name for the thumbnail.
    pub fn thumbnail_file_name(&self) -> String {
        format!(
            "{}_thumb{}",
            file_stem(&self.source_name),
            self.output_format.file_extension()
        )
    }
}

/// Name without its final extension; names with no dot pass through whole.
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
