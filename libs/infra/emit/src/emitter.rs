// [libs/infra/emit/src/emitter.rs]
//! Emitter: drains the Batch Buffer through a Connection Manager, either
//! on a periodic timer or eagerly when the buffer reports full.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::batch::BatchBuffer;
use crate::connection::ConnectionManager;

/// A batch that failed delivery, held for retry. `attempts` counts
/// delivery attempts made so far, including the one that just failed.
struct PendingBatch {
    lines: Vec<String>,
    attempts: u32,
}

/// Drains `buffer` into `connection_manager` every `flush_interval`. A
/// failed write invalidates the connection and holds the batch for retry
/// (at the front of the retry queue, ahead of anything freshly flushed)
/// up to `max_attempts`; beyond that the batch is dropped and an error
/// counter increments.
pub struct Emitter {
    buffer: Arc<BatchBuffer>,
    connection_manager: Arc<ConnectionManager>,
    flush_interval: Duration,
    max_attempts: u32,
    retry_queue: Mutex<VecDeque<PendingBatch>>,
}

impl Emitter {
    pub fn new(
        buffer: Arc<BatchBuffer>,
        connection_manager: Arc<ConnectionManager>,
        flush_interval: Duration,
        max_attempts: u32,
    ) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            connection_manager,
            flush_interval,
            max_attempts: max_attempts.max(1),
            retry_queue: Mutex::new(VecDeque::new()),
        })
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.flush_once().await;
                    return;
                }
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
            }
        }
    }

    /// One flush cycle: retries the oldest pending batch first (if any),
    /// then drains whatever the producer-facing buffer has accumulated.
    pub async fn flush_once(&self) {
        if let Some(pending) = self.retry_queue.lock().pop_front() {
            self.deliver(pending.lines, pending.attempts).await;
        }
        let batch = self.buffer.flush();
        if !batch.is_empty() {
            self.deliver(batch, 0).await;
        }
    }

    async fn deliver(&self, lines: Vec<String>, prior_attempts: u32) {
        let attempts = prior_attempts + 1;
        let conn = self.connection_manager.get();
        let endpoint = self.connection_manager.endpoint().to_string();
        match conn.write_lines(&lines, &endpoint).await {
            Ok(bytes) => {
                metrics::counter!("emitter_bytes_written_total").increment(bytes as u64);
                metrics::counter!("emitter_lines_written_total").increment(lines.len() as u64);
            }
            Err(err) => {
                self.connection_manager.invalidate(&conn);
                if attempts >= self.max_attempts {
                    metrics::counter!("emitter_batches_dropped_total").increment(1);
                    warn!(endpoint = %endpoint, attempts, error = %err, "batch dropped after repeated write failures");
                } else {
                    warn!(endpoint = %endpoint, attempts, error = %err, "write failed, requeuing batch for retry");
                    self.retry_queue.lock().push_front(PendingBatch { lines, attempts });
                }
            }
        }
    }
}
