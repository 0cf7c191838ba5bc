// [libs/infra/emit/src/connection.rs]
//! Connection Manager: one instance per downstream endpoint. Holds the
//! currently-handed-out [`Connection`] and a `first_good_id` watermark;
//! reconnection is driven by a background reconciler task rather than by
//! the writer that discovered the failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ConnectionBuildError, WriteError};

/// Fallback backoff bounds used by [`ConnectionManager::connect`] (the
/// two-argument convenience constructor); callers that honor spec.md §6's
/// `reconnect_initial_ms`/`reconnect_max_ms` configuration should use
/// [`ConnectionManager::connect_with_backoff`] instead.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Healthy,
    Reconnecting,
}

/// One live TCP connection to an endpoint, identified by a monotonic id
/// assigned by its [`ConnectionManager`]. `id = 0` is reserved for the
/// disconnected placeholder handed out when even the initial connect fails.
pub struct Connection {
    pub id: u64,
    writer: Option<AsyncMutex<BufWriter<TcpStream>>>,
}

impl Connection {
    async fn connect(endpoint: &str, id: u64) -> Result<Self, ConnectionBuildError> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|source| ConnectionBuildError::Io {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            id,
            writer: Some(AsyncMutex::new(BufWriter::with_capacity(8192, stream))),
        })
    }

    fn disconnected() -> Self {
        Self { id: 0, writer: None }
    }

    /// Writes every line newline-terminated, then flushes. Returns the
    /// exact byte count written on success.
    pub async fn write_lines(&self, lines: &[String], endpoint: &str) -> Result<usize, WriteError> {
        let Some(writer) = &self.writer else {
            return Err(WriteError::Io {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "no connection has been established yet",
                ),
            });
        };
        let mut writer = writer.lock().await;
        let mut total = 0usize;
        for line in lines {
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(|source| WriteError::Io {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            writer.write_all(b"\n").await.map_err(|source| WriteError::Io {
                endpoint: endpoint.to_string(),
                source,
            })?;
            total += line.len() + 1;
        }
        writer.flush().await.map_err(|source| WriteError::Io {
            endpoint: endpoint.to_string(),
            source,
        })?;
        Ok(total)
    }
}

pub struct ConnectionManager {
    endpoint: String,
    handed_out: RwLock<Arc<Connection>>,
    first_good_id: AtomicU64,
    state: RwLock<ConnectionState>,
    rebuild_signal: Notify,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl ConnectionManager {
    /// Attempts the initial Connection (id=1) before returning, using the
    /// default 1s/60s backoff bounds. A dead endpoint at this point is not
    /// fatal: the manager comes back holding a disconnected placeholder in
    /// `Reconnecting` state, and the caller's background reconciler
    /// (`run_reconciler`) takes over with the same backoff used for any
    /// later invalidation.
    pub async fn connect(endpoint: String) -> Arc<Self> {
        Self::connect_with_backoff(endpoint, INITIAL_BACKOFF, MAX_BACKOFF).await
    }

    /// Same as [`Self::connect`], but with caller-supplied backoff bounds —
    /// spec.md §6's `reconnect_initial_ms`/`reconnect_max_ms` configuration.
    pub async fn connect_with_backoff(
        endpoint: String,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Arc<Self> {
        let (initial, state, first_good_id) = match Connection::connect(&endpoint, 1).await {
            Ok(conn) => (conn, ConnectionState::Healthy, 1),
            Err(err) => {
                metrics::counter!("http_errors_total", "endpoint" => endpoint.clone()).increment(1);
                warn!(endpoint = %endpoint, error = %err, "initial connect failed, starting in reconnecting state");
                // The placeholder's id is 0, so the watermark must start at 0 too —
                // otherwise `current.id >= first_good_id` is violated the instant the
                // manager is constructed, before the reconciler has run at all.
                (Connection::disconnected(), ConnectionState::Reconnecting, 0)
            }
        };
        let manager = Arc::new(Self {
            endpoint,
            handed_out: RwLock::new(Arc::new(initial)),
            first_good_id: AtomicU64::new(first_good_id),
            state: RwLock::new(state),
            rebuild_signal: Notify::new(),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        });
        if state == ConnectionState::Reconnecting {
            manager.rebuild_signal.notify_one();
        }
        manager
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn get(&self) -> Arc<Connection> {
        self.handed_out.read().clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Idempotent: a stale invalidate (below the current watermark) is a
    /// no-op. Otherwise advances the watermark and wakes the reconciler.
    pub fn invalidate(&self, conn: &Connection) {
        let candidate = conn.id + 1;
        let previous = self.first_good_id.fetch_max(candidate, Ordering::SeqCst);
        if candidate <= previous {
            return;
        }
        *self.state.write() = ConnectionState::Reconnecting;
        self.rebuild_signal.notify_one();
    }

    /// Background reconciler: waits on the invalidate signal, then rebuilds
    /// with exponential backoff (jittered, doubling up to this manager's
    /// configured cap) until the handed-out connection is replaced.
    pub async fn run_reconciler(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = self.rebuild_signal.notified() => {}
            }
            self.clone().rebuild_loop(&shutdown).await;
        }
    }

    async fn rebuild_loop(self: &Arc<Self>, shutdown: &CancellationToken) {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let target_id = self.first_good_id.load(Ordering::SeqCst);
            debug!(endpoint = %self.endpoint, target_id, attempt, "rebuilding connection");
            match Connection::connect(&self.endpoint, target_id).await {
                Ok(fresh) => {
                    *self.handed_out.write() = Arc::new(fresh);
                    *self.state.write() = ConnectionState::Healthy;
                    info!(endpoint = %self.endpoint, id = target_id, "connection rebuilt");
                    return;
                }
                Err(err) => {
                    metrics::counter!("http_errors_total", "endpoint" => self.endpoint.clone()).increment(1);
                    warn!(endpoint = %self.endpoint, error = %err, "reconnect attempt failed");
                    let jitter = Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..1.0));
                    let wait = (backoff + jitter).min(self.max_backoff + Duration::from_secs(1));
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(wait) => {}
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn echo_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn connect_builds_initial_connection_with_id_one() {
        let (listener, addr) = echo_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        let manager = ConnectionManager::connect(addr).await;
        assert_eq!(manager.get().id, 1);
        assert_eq!(manager.state(), ConnectionState::Healthy);
    }

    #[tokio::test]
    async fn dead_port_at_startup_recovers_once_reconciler_runs() {
        // Reserve an address, then let the port go dead before anyone connects.
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap().to_string();
        drop(probe);

        let manager = ConnectionManager::connect(addr.clone()).await;
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert_eq!(manager.get().id, 0);
        // Testable property 2 (spec.md §8): current.id >= first_good_id at
        // every observation point, including immediately after construction
        // with a dead initial endpoint.
        assert!(manager.get().id >= manager.first_good_id.load(Ordering::SeqCst));

        let listener = TcpListener::bind(&addr).await.unwrap();
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    return;
                }
            }
        });

        let shutdown = CancellationToken::new();
        let reconciler = tokio::spawn(manager.clone().run_reconciler(shutdown.clone()));

        for _ in 0..50 {
            if manager.state() == ConnectionState::Healthy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(manager.state(), ConnectionState::Healthy);
        assert_eq!(manager.get().id, 1);

        shutdown.cancel();
        let _ = reconciler.await;
    }

    #[tokio::test]
    async fn invalidate_below_watermark_is_noop() {
        let (listener, addr) = echo_listener().await;
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    return;
                }
            }
        });
        let manager = ConnectionManager::connect(addr).await;
        let conn = manager.get();
        manager.invalidate(&conn);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        let state_after_first = manager.state();
        manager.invalidate(&conn);
        assert_eq!(manager.state(), state_after_first);
    }

    #[tokio::test]
    async fn reconciler_rebuilds_after_invalidate() {
        let (listener, addr) = echo_listener().await;
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    return;
                }
            }
        });
        let manager = ConnectionManager::connect(addr).await;
        let shutdown = CancellationToken::new();
        let reconciler = tokio::spawn(manager.clone().run_reconciler(shutdown.clone()));

        let conn = manager.get();
        manager.invalidate(&conn);

        for _ in 0..50 {
            if manager.state() == ConnectionState::Healthy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(manager.state(), ConnectionState::Healthy);
        assert_eq!(manager.get().id, 2);

        shutdown.cancel();
        let _ = reconciler.await;
    }
}
