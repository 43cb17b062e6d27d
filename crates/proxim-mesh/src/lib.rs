//! # proxim-mesh
//!
//! Role-negotiated socket fabric for the Proxim mesh. One peer acts as
//! the hub (listens, accepts, relays between spokes); the others are
//! spokes holding a single connection to the hub. Inbound records are
//! decoded and fed to the device registry; outbound reports fan out to
//! every live connection, best effort.
//!
//! The role is assigned externally by the discovery collaborator; the
//! transport never decides it.

pub mod conn;
pub mod link;
pub mod transport;

pub use conn::{BroadcastOutcome, ConnId, ConnectionSet};
pub use link::{LinkControl, NoopLink};
pub use transport::MeshTransport;
