//! Domain models

pub mod item;
pub mod result;
pub mod settings;

pub use item::{ItemStatus, SourceItem};
pub use result::ProcessedResult;
pub use settings::{
    CropAspectRatio, CropSettings, OutputFormat, PresetSize, ResizeSettings, SizeMode,
};
