use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::warn;

/// Identifier of one live connection, unique within a transport.
pub type ConnId = u64;

/// The send side of one live connection. Writes are serialized per
/// connection by the async mutex on the write half.
#[derive(Clone)]
struct Connection {
    id: ConnId,
    addr: SocketAddr,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
}

impl Connection {
    /// Write one record, appending the newline frame terminator.
    async fn send_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
}

/// Result of one broadcast cycle.
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// Connections the record was written to.
    pub delivered: usize,
    /// Connections that failed the write and were removed from the set.
    pub failed: Vec<ConnId>,
}

/// The set of live connections: every spoke socket on the hub, or the
/// single hub socket on a spoke.
///
/// A connection is a member from accept/connect until explicit close or an
/// I/O failure; failed connections are removed before the next broadcast
/// cycle, so no cycle targets a dead socket twice.
#[derive(Clone, Default)]
pub struct ConnectionSet {
    inner: Arc<Mutex<HashMap<ConnId, Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted/connected socket's write half.
    pub fn insert(&self, addr: SocketAddr, writer: OwnedWriteHalf) -> ConnId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn = Connection {
            id,
            addr,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
        };
        self.inner.lock().insert(id, conn);
        id
    }

    /// Drop a connection; its write half closes when the last clone goes.
    pub fn remove(&self, id: ConnId) -> bool {
        self.inner.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop every connection at once (transport teardown).
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    fn snapshot(&self) -> Vec<Connection> {
        self.inner.lock().values().cloned().collect()
    }

    /// Best-effort fan-out of one framed record to every live connection
    /// except `exclude` (the relaying sender).
    ///
    /// A write failure removes that one connection and the fan-out
    /// continues; partial delivery is an accepted outcome, not an error.
    pub async fn broadcast(&self, line: &str, exclude: Option<ConnId>) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        for conn in self.snapshot() {
            if Some(conn.id) == exclude {
                continue;
            }
            match conn.send_line(line).await {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    warn!(conn_id = conn.id, addr = %conn.addr, error = %e, "send failed, dropping connection");
                    self.remove(conn.id);
                    outcome.failed.push(conn.id);
                }
            }
        }
        outcome
    }
}
