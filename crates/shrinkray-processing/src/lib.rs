//! Shrinkray processing library
//!
//! This crate provides the CPU side of shrinkray:
//! - Resize/crop geometry (geometry)
//! - Format-specific encoding behind one entry point (codec)
//! - The decode → crop → resize → encode → thumbnail pipeline (pipeline)
//! - Input file validation (validator)
//!
//! Everything here is synchronous and stateless per call; the worker crate
//! decides where it runs.

pub mod codec;
pub mod geometry;
pub mod pipeline;
pub mod validator;

pub use codec::encode;
pub use geometry::{center_crop, fit_size, CropRegion};
pub use pipeline::{PipelineExecutor, PipelineOutput, PipelineStage};
pub use validator::{FileValidator, ValidationError};
