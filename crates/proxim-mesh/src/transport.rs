//! Socket lifecycle for both mesh roles.
//!
//! The hub runs one accept task plus one reader task per spoke; a spoke
//! runs a single reader against the hub. Every task runs inside
//! `tokio::select!` against the session's cancellation token, so teardown
//! never waits on data arrival.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream, tcp::OwnedReadHalf};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use proxim_config::schema::MeshConfig;
use proxim_core::{Event, EventBus, ProximError, Report, Result, Role};
use proxim_registry::DeviceRegistry;

use crate::conn::{ConnId, ConnectionSet};
use crate::link::{LinkControl, NoopLink};

/// Longest accepted wire record; a peer exceeding this is dropped.
const MAX_RECORD_LEN: usize = 64 * 1024;

struct Session {
    role: Role,
    cancel: CancellationToken,
    /// Actual bound address (hub only); useful when the port is 0.
    local_addr: Option<SocketAddr>,
}

/// The mesh transport for one device.
///
/// Owns the connection set and all socket tasks for the current session.
/// Decoded inbound reports go to the registry; raw records are relayed
/// hub-side to every other spoke.
pub struct MeshTransport {
    config: MeshConfig,
    registry: Arc<DeviceRegistry>,
    events: EventBus,
    connections: ConnectionSet,
    link: Arc<dyn LinkControl>,
    session: Mutex<Option<Session>>,
}

impl MeshTransport {
    pub fn new(config: MeshConfig, registry: Arc<DeviceRegistry>, events: EventBus) -> Self {
        Self {
            config,
            registry,
            events,
            connections: ConnectionSet::new(),
            link: Arc::new(NoopLink),
            session: Mutex::new(None),
        }
    }

    /// Attach the discovery collaborator used on disconnect.
    pub fn with_link(mut self, link: Arc<dyn LinkControl>) -> Self {
        self.link = link;
        self
    }

    /// The role of the current session, if one is established.
    pub fn role(&self) -> Option<Role> {
        self.session.lock().as_ref().map(|s| s.role)
    }

    /// Bound listen address of the current hub session.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session.lock().as_ref().and_then(|s| s.local_addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The discovery collaborator assigned us a role; start the matching
    /// socket fabric. A hub address is required for (and only used by)
    /// the spoke role.
    ///
    /// A spoke that cannot reach the hub within the connect timeout gets
    /// `ProximError::Connect`; the failure is also published as a status
    /// event and the transport stays idle until the next assignment.
    pub async fn assign_role(&self, role: Role, hub_addr: Option<SocketAddr>) -> Result<()> {
        // A fresh assignment supersedes any live session.
        self.teardown();

        let cancel = CancellationToken::new();
        let result = match role {
            Role::Hub => self.start_hub(cancel.clone()).await,
            Role::Spoke => self.start_spoke(hub_addr, cancel.clone()).await,
        };

        match result {
            Ok(local_addr) => {
                info!(role = %role, "mesh session started");
                *self.session.lock() = Some(Session {
                    role,
                    cancel,
                    local_addr,
                });
                Ok(())
            }
            Err(e) => {
                cancel.cancel();
                self.events.status(format!("{role} start failed: {e}"));
                Err(e)
            }
        }
    }

    async fn start_hub(&self, cancel: CancellationToken) -> Result<Option<SocketAddr>> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        let local_addr = listener.local_addr()?;
        self.events
            .status(format!("hub listening on port {}", local_addr.port()));

        let connections = self.connections.clone();
        let registry = self.registry.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            spawn_connection(
                                stream,
                                addr,
                                true,
                                connections.clone(),
                                registry.clone(),
                                events.clone(),
                                cancel.clone(),
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
            debug!("accept loop stopped");
        });

        Ok(Some(local_addr))
    }

    async fn start_spoke(
        &self,
        hub_addr: Option<SocketAddr>,
        cancel: CancellationToken,
    ) -> Result<Option<SocketAddr>> {
        let addr = hub_addr.ok_or_else(|| {
            ProximError::Config("spoke role assigned without a hub address".into())
        })?;

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProximError::Connect {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ProximError::Connect {
                    addr: addr.to_string(),
                    reason: format!("timed out after {} ms", self.config.connect_timeout_ms),
                });
            }
        };

        self.events.status(format!("connected to hub at {addr}"));
        spawn_connection(
            stream,
            addr,
            false,
            self.connections.clone(),
            self.registry.clone(),
            self.events.clone(),
            cancel,
        );
        Ok(None)
    }

    /// Encode the report once and write it to every live connection.
    ///
    /// Best-effort fan-out: a write failure removes that connection and
    /// the rest still get the record. Returns the delivered count.
    pub async fn send_data(&self, report: &Report) -> Result<usize> {
        let line = proxim_proto::encode(report)?;
        let outcome = self.connections.broadcast(&line, None).await;
        for conn_id in outcome.failed {
            self.events.publish(Event::PeerDisconnected { conn_id });
        }
        Ok(outcome.delivered)
    }

    /// Full teardown: stop every task, close every socket, and ask the
    /// discovery collaborator to drop the physical link.
    pub async fn disconnect(&self) {
        self.teardown();
        if let Err(e) = self.link.remove_link().await {
            warn!(error = %e, "link removal failed");
        }
        self.events.status("disconnected");
    }

    /// The collaborator reports the physical link already gone; tear down
    /// the local session without asking it to remove anything.
    pub fn link_down(&self) {
        self.teardown();
        self.events.status("link down");
    }

    fn teardown(&self) {
        if let Some(session) = self.session.lock().take() {
            session.cancel.cancel();
        }
        self.connections.clear();
    }
}

impl Drop for MeshTransport {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Register an established socket and start its reader task.
fn spawn_connection(
    stream: TcpStream,
    addr: SocketAddr,
    relay: bool,
    connections: ConnectionSet,
    registry: Arc<DeviceRegistry>,
    events: EventBus,
    cancel: CancellationToken,
) {
    let (read_half, write_half) = stream.into_split();
    let conn_id = connections.insert(addr, write_half);
    info!(conn_id, addr = %addr, "peer connected");
    events.publish(Event::PeerConnected {
        conn_id,
        addr: addr.to_string(),
    });

    tokio::spawn(run_reader(
        conn_id,
        read_half,
        addr,
        relay,
        connections,
        registry,
        events,
        cancel,
    ));
}

/// Per-connection read loop: decode each framed record into a registry
/// update and, hub-side, relay the raw record to every other spoke.
///
/// EOF or an I/O error removes this one connection and ends the task;
/// other connections are unaffected. Malformed records are dropped and
/// the stream keeps going.
#[allow(clippy::too_many_arguments)]
async fn run_reader(
    conn_id: ConnId,
    read_half: OwnedReadHalf,
    addr: SocketAddr,
    relay: bool,
    connections: ConnectionSet,
    registry: Arc<DeviceRegistry>,
    events: EventBus,
    cancel: CancellationToken,
) {
    let mut lines = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(MAX_RECORD_LEN),
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next() => match next {
                Some(Ok(line)) => match proxim_proto::decode(&line) {
                    Ok(report) => {
                        registry.update(report);
                        if relay {
                            let outcome = connections.broadcast(&line, Some(conn_id)).await;
                            for failed in outcome.failed {
                                events.publish(Event::PeerDisconnected { conn_id: failed });
                            }
                        }
                    }
                    Err(e) => {
                        debug!(conn_id, error = %e, "dropping malformed record");
                    }
                },
                Some(Err(e)) => {
                    warn!(conn_id, addr = %addr, error = %e, "read failed");
                    break;
                }
                None => {
                    debug!(conn_id, addr = %addr, "peer closed the connection");
                    break;
                }
            }
        }
    }

    if connections.remove(conn_id) {
        events.publish(Event::PeerDisconnected { conn_id });
        events.status(format!("peer {addr} disconnected"));
    }
}
