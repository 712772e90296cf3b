//! Messages exchanged between the queue coordinator and the worker pool.
//!
//! Requests flow coordinator → worker, responses flow back. Everything is
//! correlated by item id; the coordinator ignores responses whose id has no
//! matching in-flight request. Raw payloads ride along in memory and are
//! skipped by serde; the serialized form carries metadata only.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shrinkray_core::ResizeSettings;
use shrinkray_processing::PipelineStage;

/// Request sent to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    /// Process one image. The payload moves with the request; the sender
    /// keeps metadata only.
    #[serde(rename_all = "camelCase")]
    ProcessImage {
        id: Uuid,
        #[serde(skip)]
        data: Bytes,
        settings: ResizeSettings,
    },
}

impl WorkerRequest {
    pub fn id(&self) -> Uuid {
        match self {
            WorkerRequest::ProcessImage { id, .. } => *id,
        }
    }
}

/// Response emitted by a worker.
///
/// For a single id, `progress` messages arrive in stage order and always
/// before the one terminal `result` or `error`; messages for different ids
/// interleave freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerResponse {
    #[serde(rename_all = "camelCase")]
    Progress {
        id: Uuid,
        /// 0-100.
        progress: u8,
        stage: PipelineStage,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        id: Uuid,
        #[serde(skip)]
        resized: Bytes,
        #[serde(skip)]
        thumbnail: Bytes,
        original_width: u32,
        original_height: u32,
        width: u32,
        height: u32,
        cropped: bool,
    },
    #[serde(rename_all = "camelCase")]
    Error { id: Uuid, message: String },
}

impl WorkerResponse {
    pub fn id(&self) -> Uuid {
        match self {
            WorkerResponse::Progress { id, .. }
            | WorkerResponse::Result { id, .. }
            | WorkerResponse::Error { id, .. } => *id,
        }
    }

    /// True for `result` and `error`; a terminal response resolves its id.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerResponse::Progress { .. })
    }
}
