//! Shared constants for input validation and output sizing.

/// Long edge of generated thumbnails, in pixels.
pub const THUMBNAIL_SIZE: u32 = 150;

/// Maximum accepted input file size (1 GiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Smallest configurable resize target (long edge, pixels).
pub const MIN_TARGET_SIZE: u32 = 10;

/// Largest configurable resize target (long edge, pixels).
pub const MAX_TARGET_SIZE: u32 = 3840;

/// Lower bound of the quality knob.
pub const MIN_QUALITY: u8 = 50;

/// Upper bound of the quality knob.
pub const MAX_QUALITY: u8 = 100;

/// Media types accepted as pipeline input.
pub const SUPPORTED_INPUT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// File extensions accepted as pipeline input (lowercase, no dot).
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
