//! Queue items: one submitted file tracked through its lifecycle.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Waiting,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemStatus::Waiting => write!(f, "waiting"),
            ItemStatus::Processing => write!(f, "processing"),
            ItemStatus::Completed => write!(f, "completed"),
            ItemStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(ItemStatus::Waiting),
            "processing" => Ok(ItemStatus::Processing),
            "completed" => Ok(ItemStatus::Completed),
            "error" => Ok(ItemStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid item status: {}", s)),
        }
    }
}

/// One submitted image awaiting or undergoing processing.
///
/// The payload is moved out when the item is dispatched to the worker; after
/// that only the metadata (name, size, media type) stays behind for building
/// the final result record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: Uuid,
    #[serde(skip)]
    pub payload: Option<Bytes>,
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub status: ItemStatus,
    /// 0-100.
    pub progress: u8,
    pub error: Option<String>,
}

impl SourceItem {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, payload: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            size: payload.len() as u64,
            payload: Some(payload),
            name: name.into(),
            media_type: media_type.into(),
            status: ItemStatus::Waiting,
            progress: 0,
            error: None,
        }
    }

    /// Move the raw bytes out for transfer to the worker.
    pub fn take_payload(&mut self) -> Option<Bytes> {
        self.payload.take()
    }
}
