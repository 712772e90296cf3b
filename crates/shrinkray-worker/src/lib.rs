//! Shrinkray worker library
//!
//! The asynchronous half of shrinkray: the message protocol between the
//! coordinator and the processing workers, the bounded worker-pool transport,
//! the queue coordinator that owns item/result state, and the telemetry sink
//! interface.

pub mod protocol;
pub mod queue;
pub mod telemetry;
pub mod transport;

pub use protocol::{WorkerRequest, WorkerResponse};
pub use queue::{IncomingFile, QueueConfig, QueueCoordinator, QueueEvent};
pub use telemetry::{
    ImageConvertErrorEvent, ImageConvertedEvent, LogTelemetry, NoOpTelemetry, TelemetrySink,
};
pub use transport::{TransportConfig, WorkerTransport};
