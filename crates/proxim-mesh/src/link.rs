use async_trait::async_trait;

use proxim_core::Result;

/// Boundary to the platform's peer-discovery and link-establishment
/// facility.
///
/// The collaborator assigns roles through
/// [`MeshTransport::assign_role`](crate::MeshTransport::assign_role) and
/// reports physical loss through
/// [`MeshTransport::link_down`](crate::MeshTransport::link_down); the
/// transport asks it here to drop the established link on disconnect.
#[async_trait]
pub trait LinkControl: Send + Sync {
    async fn remove_link(&self) -> Result<()>;
}

/// No-op collaborator for hosts without a managed physical link (the CLI
/// harness, tests).
pub struct NoopLink;

#[async_trait]
impl LinkControl for NoopLink {
    async fn remove_link(&self) -> Result<()> {
        Ok(())
    }
}
