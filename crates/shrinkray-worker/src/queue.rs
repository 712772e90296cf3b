//! Queue coordination.
//!
//! The coordinator is the single owner of item and result state. Workers
//! never touch it; they only emit messages, and every mutation happens here
//! in response to a submit call or a worker response. Dedup/tracking sets
//! (dispatched ids, resolved ids, in-flight metadata) are plain fields with
//! one clear point: [`QueueCoordinator::reset`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use shrinkray_core::{
    ItemStatus, ProcessError, ProcessedResult, ResizeSettings, SourceItem,
};

use crate::protocol::{WorkerRequest, WorkerResponse};
use crate::telemetry::{
    truncate_message, ImageConvertErrorEvent, ImageConvertedEvent, NoOpTelemetry, TelemetrySink,
};
use crate::transport::{TransportConfig, WorkerTransport};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum items in flight at once.
    pub max_workers: usize,
    /// Capacity of the transport channels.
    pub channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            channel_capacity: 64,
        }
    }
}

/// A file that already passed validation, ready for submission.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub media_type: String,
    pub data: Bytes,
}

/// State-change notifications for a host UI.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Status {
        id: Uuid,
        status: ItemStatus,
        progress: u8,
        error: Option<String>,
    },
    ResultAdded {
        id: Uuid,
    },
    ResultRemoved {
        id: Uuid,
    },
    Reset,
}

/// Metadata retained while an item's payload is with the worker.
struct InFlight {
    name: String,
    size: u64,
    settings: ResizeSettings,
    started: Instant,
}

pub struct QueueCoordinator {
    items: Vec<SourceItem>,
    results: Vec<ProcessedResult>,
    /// Every id ever dispatched. Guards against double-sending; cleared only
    /// by reset.
    sent: HashSet<Uuid>,
    /// Ids whose terminal response has been applied; duplicates are dropped.
    resolved: HashSet<Uuid>,
    in_flight: HashMap<Uuid, InFlight>,
    settings_by_id: HashMap<Uuid, ResizeSettings>,
    transport: WorkerTransport,
    response_rx: mpsc::Receiver<WorkerResponse>,
    telemetry: Arc<dyn TelemetrySink>,
    event_tx: Option<mpsc::Sender<QueueEvent>>,
    max_workers: usize,
}

impl QueueCoordinator {
    pub fn new(config: QueueConfig) -> Self {
        let (transport, response_rx) = WorkerTransport::spawn(TransportConfig {
            max_workers: config.max_workers,
            channel_capacity: config.channel_capacity,
        });
        Self {
            items: Vec::new(),
            results: Vec::new(),
            sent: HashSet::new(),
            resolved: HashSet::new(),
            in_flight: HashMap::new(),
            settings_by_id: HashMap::new(),
            transport,
            response_rx,
            telemetry: Arc::new(NoOpTelemetry),
            event_tx: None,
            max_workers: config.max_workers,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_event_sender(mut self, event_tx: mpsc::Sender<QueueEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Admit validated files as waiting items. Settings are captured per item
    /// at submission; later edits never affect an admitted batch.
    pub async fn submit(
        &mut self,
        files: Vec<IncomingFile>,
        settings: &ResizeSettings,
    ) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let item = SourceItem::new(file.name, file.media_type, file.data);
            let id = item.id;
            tracing::debug!(item_id = %id, name = %item.name, size = item.size, "item queued");
            self.settings_by_id.insert(id, settings.clone());
            self.items.push(item);
            ids.push(id);
            self.emit_status(id).await;
        }
        tracing::info!(count = ids.len(), "batch submitted");
        ids
    }

    /// Dispatch eligible waiting items. No-op when nothing is waiting or the
    /// pool is already full.
    pub async fn start_processing(&mut self) {
        self.dispatch_waiting().await;
    }

    /// Apply one worker response and, on a terminal response, dispatch any
    /// newly eligible waiting items so the queue keeps draining on its own.
    pub async fn process_response(&mut self, response: WorkerResponse) {
        let id = response.id();
        if !self.is_live(id) {
            let err = ProcessError::Protocol(format!(
                "{} response for unknown or already-resolved id",
                if response.is_terminal() { "terminal" } else { "progress" }
            ));
            tracing::debug!(item_id = %id, code = err.code(), "{}", err);
            return;
        }

        match response {
            WorkerResponse::Progress {
                id,
                progress,
                stage,
            } => {
                tracing::trace!(item_id = %id, progress = progress, stage = %stage, "progress");
                if let Some(item) = self.item_mut(id) {
                    item.progress = progress;
                }
                self.emit_status(id).await;
            }
            WorkerResponse::Result {
                id,
                resized,
                thumbnail,
                original_width,
                original_height,
                width,
                height,
                cropped,
            } => {
                let info = match self.in_flight.remove(&id) {
                    Some(info) => info,
                    None => return,
                };
                self.resolved.insert(id);

                let settings = info.settings;
                let event = ImageConvertedEvent {
                    output_format: settings.output_format,
                    resize_enabled: settings.resize_enabled,
                    max_size: settings.max_size,
                    quality: settings.quality,
                    original_bytes: info.size,
                    result_bytes: resized.len() as u64,
                    result_width: width,
                    result_height: height,
                    duration_ms: info.started.elapsed().as_millis() as u64,
                };
                let result = ProcessedResult {
                    id,
                    source_name: info.name,
                    original_bytes: info.size,
                    resized,
                    thumbnail,
                    width,
                    height,
                    original_width,
                    original_height,
                    cropped,
                    crop_aspect_ratio: cropped.then_some(settings.crop.aspect_ratio),
                    output_format: settings.output_format,
                    resize_enabled: settings.resize_enabled,
                    max_size: settings.max_size,
                    quality: settings.quality,
                };

                if let Some(item) = self.item_mut(id) {
                    item.status = ItemStatus::Completed;
                    item.progress = 100;
                }
                self.results.push(result);
                tracing::info!(
                    item_id = %id,
                    width = width,
                    height = height,
                    duration_ms = event.duration_ms,
                    "item completed"
                );

                self.emit_status(id).await;
                self.emit(QueueEvent::ResultAdded { id }).await;
                self.telemetry.image_converted(event).await;
                self.dispatch_waiting().await;
            }
            WorkerResponse::Error { id, message } => {
                let info = match self.in_flight.remove(&id) {
                    Some(info) => info,
                    None => return,
                };
                self.resolved.insert(id);

                let settings = info.settings;
                let event = ImageConvertErrorEvent {
                    message: truncate_message(&message),
                    output_format: settings.output_format,
                    resize_enabled: settings.resize_enabled,
                    max_size: settings.max_size,
                    quality: settings.quality,
                };

                if let Some(item) = self.item_mut(id) {
                    item.status = ItemStatus::Error;
                    item.error = Some(message.clone());
                }
                tracing::warn!(item_id = %id, error = %message, "item failed");

                self.emit_status(id).await;
                self.telemetry.image_convert_error(event).await;
                self.dispatch_waiting().await;
            }
        }
    }

    /// Process responses until nothing is waiting or in flight.
    pub async fn run_until_drained(&mut self) {
        self.dispatch_waiting().await;
        while !self.in_flight.is_empty() {
            match self.response_rx.recv().await {
                Some(response) => self.process_response(response).await,
                None => {
                    tracing::error!("worker response channel closed while items were in flight");
                    break;
                }
            }
        }
    }

    /// Clear items, results, and every tracking set. Responses for cleared
    /// ids that are still in transit get dropped by the correlation check.
    pub async fn reset(&mut self) {
        tracing::info!(
            items = self.items.len(),
            results = self.results.len(),
            "queue reset"
        );
        self.items.clear();
        self.results.clear();
        self.sent.clear();
        self.resolved.clear();
        self.in_flight.clear();
        self.settings_by_id.clear();
        self.emit(QueueEvent::Reset).await;
    }

    /// Remove one result. Returns false when the id is unknown.
    pub async fn remove_result(&mut self, id: Uuid) -> bool {
        let before = self.results.len();
        self.results.retain(|result| result.id != id);
        let removed = self.results.len() != before;
        if removed {
            self.emit(QueueEvent::ResultRemoved { id }).await;
        }
        removed
    }

    pub fn items(&self) -> &[SourceItem] {
        &self.items
    }

    pub fn results(&self) -> &[ProcessedResult] {
        &self.results
    }

    pub fn is_processing(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Stop the worker pool. In-flight runs finish but their responses are
    /// no longer consumed.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }

    async fn dispatch_waiting(&mut self) {
        let waiting: Vec<Uuid> = self
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Waiting && !self.sent.contains(&item.id))
            .map(|item| item.id)
            .collect();

        for id in waiting {
            if self.in_flight.len() >= self.max_workers {
                break;
            }
            self.dispatch_one(id).await;
        }
    }

    async fn dispatch_one(&mut self, id: Uuid) {
        let settings = match self.settings_by_id.get(&id) {
            Some(settings) => settings.clone(),
            None => {
                tracing::error!(item_id = %id, "no settings snapshot for item");
                return;
            }
        };

        let (name, size, data) = {
            let Some(item) = self.item_mut(id) else {
                return;
            };
            let Some(data) = item.take_payload() else {
                tracing::error!(item_id = %id, "item has no payload to dispatch");
                item.status = ItemStatus::Error;
                item.error = Some("payload missing".to_string());
                return;
            };
            item.status = ItemStatus::Processing;
            item.progress = 0;
            (item.name.clone(), item.size, data)
        };

        self.sent.insert(id);
        self.in_flight.insert(
            id,
            InFlight {
                name,
                size,
                settings: settings.clone(),
                started: Instant::now(),
            },
        );
        self.emit_status(id).await;
        tracing::debug!(item_id = %id, "dispatching to worker pool");

        if let Err(e) = self
            .transport
            .send(WorkerRequest::ProcessImage { id, data, settings })
            .await
        {
            tracing::error!(item_id = %id, error = %e, "dispatch failed");
            self.in_flight.remove(&id);
            self.resolved.insert(id);
            if let Some(item) = self.item_mut(id) {
                item.status = ItemStatus::Error;
                item.error = Some(e.to_string());
            }
            self.emit_status(id).await;
        }
    }

    /// A response id is live while its request is in flight and unresolved.
    fn is_live(&self, id: Uuid) -> bool {
        self.in_flight.contains_key(&id) && !self.resolved.contains(&id)
    }

    fn item_mut(&mut self, id: Uuid) -> Option<&mut SourceItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    async fn emit_status(&self, id: Uuid) {
        if self.event_tx.is_none() {
            return;
        }
        if let Some(item) = self.items.iter().find(|item| item.id == id) {
            self.emit(QueueEvent::Status {
                id,
                status: item.status,
                progress: item.progress,
                error: item.error.clone(),
            })
            .await;
        }
    }

    async fn emit(&self, event: QueueEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
