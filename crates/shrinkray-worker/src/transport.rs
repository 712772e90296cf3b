//! Worker pool transport.
//!
//! A dispatcher task owns the request channel; each request takes a semaphore
//! permit (bounding concurrent pipeline runs) and executes on the blocking
//! pool. Workers hold no state between requests; all output travels back over
//! the response channel.
//!
//! Shutdown: [`WorkerTransport::shutdown`] stops the dispatcher; it does not
//! wait for in-flight runs. Their late responses are dropped by the
//! coordinator's correlation rules.

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use bytes::Bytes;
use shrinkray_core::{ProcessError, ResizeSettings};
use shrinkray_processing::PipelineExecutor;

use crate::protocol::{WorkerRequest, WorkerResponse};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum concurrent pipeline runs.
    pub max_workers: usize,
    /// Capacity of the request and response channels.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            channel_capacity: 64,
        }
    }
}

/// Handle to a running worker pool.
pub struct WorkerTransport {
    request_tx: mpsc::Sender<WorkerRequest>,
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerTransport {
    /// Start the pool and return the handle plus the response stream.
    pub fn spawn(config: TransportConfig) -> (Self, mpsc::Receiver<WorkerResponse>) {
        let (request_tx, request_rx) = mpsc::channel(config.channel_capacity);
        let (response_tx, response_rx) = mpsc::channel(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(dispatch_loop(request_rx, response_tx, shutdown_rx, config));

        (
            Self {
                request_tx,
                shutdown_tx,
            },
            response_rx,
        )
    }

    /// Queue one request for processing.
    pub async fn send(&self, request: WorkerRequest) -> Result<(), ProcessError> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| ProcessError::Worker("worker pool is not running".to_string()))
    }

    /// Signal the dispatcher to stop accepting requests. Returns immediately;
    /// in-flight runs finish on their own.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn dispatch_loop(
    mut request_rx: mpsc::Receiver<WorkerRequest>,
    response_tx: mpsc::Sender<WorkerResponse>,
    mut shutdown_rx: mpsc::Receiver<()>,
    config: TransportConfig,
) {
    tracing::info!(max_workers = config.max_workers, "image worker pool started");
    let semaphore = Arc::new(Semaphore::new(config.max_workers));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("image worker pool shutting down");
                break;
            }
            request = request_rx.recv() => {
                let Some(WorkerRequest::ProcessImage { id, data, settings }) = request else {
                    break;
                };
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let response_tx = response_tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    process_one(id, data, settings, response_tx).await;
                });
            }
        }
    }

    tracing::info!("image worker pool stopped");
}

/// Run the pipeline for one item on the blocking pool, streaming progress.
///
/// Progress messages are fully forwarded before the terminal message goes
/// out, which preserves per-id ordering for the coordinator.
async fn process_one(
    id: Uuid,
    data: Bytes,
    settings: ResizeSettings,
    response_tx: mpsc::Sender<WorkerResponse>,
) {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let pipeline = tokio::task::spawn_blocking(move || {
        PipelineExecutor::run(&data, &settings, |progress, stage| {
            let _ = progress_tx.send((progress, stage));
        })
    });

    let forward_tx = response_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some((progress, stage)) = progress_rx.recv().await {
            let _ = forward_tx
                .send(WorkerResponse::Progress {
                    id,
                    progress,
                    stage,
                })
                .await;
        }
    });

    let outcome = pipeline.await;
    // The progress sender is gone once the blocking task returns, so the
    // forwarder drains whatever is buffered and exits.
    let _ = forwarder.await;

    let response = match outcome {
        Ok(Ok(output)) => WorkerResponse::Result {
            id,
            resized: output.resized,
            thumbnail: output.thumbnail,
            original_width: output.original_width,
            original_height: output.original_height,
            width: output.width,
            height: output.height,
            cropped: output.cropped,
        },
        Ok(Err(e)) => {
            tracing::warn!(item_id = %id, code = e.code(), error = %e, "pipeline run failed");
            WorkerResponse::Error {
                id,
                message: e.to_string(),
            }
        }
        Err(join_error) => {
            let e = ProcessError::Worker(join_error.to_string());
            tracing::error!(item_id = %id, error = %e, "pipeline task died");
            WorkerResponse::Error {
                id,
                message: e.to_string(),
            }
        }
    };

    if response_tx.send(response).await.is_err() {
        tracing::debug!(item_id = %id, "response channel closed, dropping terminal message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use shrinkray_processing::PipelineStage;
    use std::io::Cursor;

    fn png_fixture(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([50, 90, 160, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    #[tokio::test]
    async fn processes_one_request_end_to_end() {
        let (transport, mut responses) = WorkerTransport::spawn(TransportConfig::default());
        let id = Uuid::new_v4();
        transport
            .send(WorkerRequest::ProcessImage {
                id,
                data: png_fixture(1000, 500),
                settings: ResizeSettings::default(),
            })
            .await
            .unwrap();

        let mut last_progress = 0;
        let mut last_stage = PipelineStage::Loading;
        loop {
            match responses.recv().await.unwrap() {
                WorkerResponse::Progress {
                    id: got,
                    progress,
                    stage,
                } => {
                    assert_eq!(got, id);
                    assert!(progress >= last_progress, "progress went backwards");
                    assert!(stage >= last_stage, "stage went backwards");
                    last_progress = progress;
                    last_stage = stage;
                }
                WorkerResponse::Result {
                    id: got,
                    width,
                    height,
                    cropped,
                    ..
                } => {
                    assert_eq!(got, id);
                    assert_eq!((width, height), (720, 360));
                    assert!(!cropped);
                    break;
                }
                WorkerResponse::Error { message, .. } => panic!("unexpected error: {}", message),
            }
        }
        assert_eq!(last_progress, 100);
    }

    #[tokio::test]
    async fn bad_input_yields_error_response() {
        let (transport, mut responses) = WorkerTransport::spawn(TransportConfig::default());
        let id = Uuid::new_v4();
        transport
            .send(WorkerRequest::ProcessImage {
                id,
                data: Bytes::from_static(b"not an image at all"),
                settings: ResizeSettings::default(),
            })
            .await
            .unwrap();

        loop {
            match responses.recv().await.unwrap() {
                WorkerResponse::Progress { .. } => continue,
                WorkerResponse::Error { id: got, message } => {
                    assert_eq!(got, id);
                    assert!(!message.is_empty());
                    break;
                }
                WorkerResponse::Result { .. } => panic!("expected an error"),
            }
        }
    }

    #[tokio::test]
    async fn interleaved_items_each_get_one_terminal_response() {
        let (transport, mut responses) = WorkerTransport::spawn(TransportConfig {
            max_workers: 2,
            channel_capacity: 64,
        });
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for &id in &ids {
            transport
                .send(WorkerRequest::ProcessImage {
                    id,
                    data: png_fixture(400, 300),
                    settings: ResizeSettings::default(),
                })
                .await
                .unwrap();
        }

        let mut terminals = Vec::new();
        while terminals.len() < ids.len() {
            let response = responses.recv().await.unwrap();
            if response.is_terminal() {
                assert!(matches!(response, WorkerResponse::Result { .. }));
                terminals.push(response.id());
            }
        }
        terminals.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(terminals, expected);
    }

    #[tokio::test]
    async fn send_after_shutdown_fails() {
        let (transport, _responses) = WorkerTransport::spawn(TransportConfig::default());
        transport.shutdown().await;
        // Give the dispatcher a moment to exit and drop the receiver.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let result = transport
            .send(WorkerRequest::ProcessImage {
                id: Uuid::new_v4(),
                data: png_fixture(10, 10),
                settings: ResizeSettings::default(),
            })
            .await;
        assert!(matches!(result, Err(ProcessError::Worker(_))));
    }
}
