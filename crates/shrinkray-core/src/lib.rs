//! Shrinkray core library
//!
//! Domain models, settings, constants, and error types shared by the
//! processing pipeline, the queue/worker layer, and the CLI.

pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{LogLevel, ProcessError};
pub use models::item::{ItemStatus, SourceItem};
pub use models::result::ProcessedResult;
pub use models::settings::{
    CropAspectRatio, CropSettings, OutputFormat, PresetSize, ResizeSettings, SizeMode,
};
