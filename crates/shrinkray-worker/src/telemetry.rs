//! Telemetry hooks for conversion outcomes.
//!
//! The queue computes the figures (durations, byte counts, dimensions) and
//! hands finished events to a [`TelemetrySink`]; actual transmission is the
//! host's concern. [`NoOpTelemetry`] discards everything, [`LogTelemetry`]
//! writes structured tracing events.

use async_trait::async_trait;

use shrinkray_core::OutputFormat;

/// Error messages sent to telemetry are cut to this many characters.
pub const ERROR_MESSAGE_LIMIT: usize = 100;

/// Emitted once per successfully converted image.
#[derive(Debug, Clone)]
pub struct ImageConvertedEvent {
    pub output_format: OutputFormat,
    pub resize_enabled: bool,
    pub max_size: u32,
    pub quality: u8,
    pub original_bytes: u64,
    pub result_bytes: u64,
    pub result_width: u32,
    pub result_height: u32,
    pub duration_ms: u64,
}

/// Emitted once per failed conversion.
#[derive(Debug, Clone)]
pub struct ImageConvertErrorEvent {
    /// Truncated to [`ERROR_MESSAGE_LIMIT`] characters.
    pub message: String,
    pub output_format: OutputFormat,
    pub resize_enabled: bool,
    pub max_size: u32,
    pub quality: u8,
}

/// Shorten a message for telemetry without splitting a multi-byte character.
pub fn truncate_message(message: &str) -> String {
    message.chars().take(ERROR_MESSAGE_LIMIT).collect()
}

/// Sink for conversion telemetry. Implementations must tolerate being called
/// from the coordinator's hot path; do any slow transmission elsewhere.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn image_converted(&self, event: ImageConvertedEvent);

    async fn image_convert_error(&self, event: ImageConvertErrorEvent);
}

/// No-op implementation for hosts without analytics.
pub struct NoOpTelemetry;

#[async_trait]
impl TelemetrySink for NoOpTelemetry {
    async fn image_converted(&self, _event: ImageConvertedEvent) {}

    async fn image_convert_error(&self, _event: ImageConvertErrorEvent) {}
}

/// Logs every event as a structured tracing record.
pub struct LogTelemetry;

#[async_trait]
impl TelemetrySink for LogTelemetry {
    async fn image_converted(&self, event: ImageConvertedEvent) {
        tracing::info!(
            event = "image_convert",
            output_format = %event.output_format,
            resize_enabled = event.resize_enabled,
            max_size = event.max_size,
            quality = event.quality,
            original_bytes = event.original_bytes,
            result_bytes = event.result_bytes,
            result_width = event.result_width,
            result_height = event.result_height,
            duration_ms = event.duration_ms,
            "image converted"
        );
    }

    async fn image_convert_error(&self, event: ImageConvertErrorEvent) {
        tracing::info!(
            event = "image_convert_error",
            error_message = %event.message,
            output_format = %event.output_format,
            resize_enabled = event.resize_enabled,
            max_size = event.max_size,
            quality = event.quality,
            "image conversion failed"
        );
    }
}
