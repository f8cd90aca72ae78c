//! Write coordination.
//!
//! A write sends the whole payload as the resource body. Whether it lands
//! as an update or a create depends on the bridge's [`WritePolicy`]. Size
//! and mode are synthetic, so nothing is verified after a 2xx.

use crate::bridge::Bridge;
use crate::gateway::Gateway;
use crate::route::Operation;
use crate::vfs::{SEPARATOR, VfsError, VfsResult, VirtualPath};

/// How a bridge turns a write into HTTP calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// PUT the path; if the service answers `missing_status`, POST the
    /// same payload to the parent collection once.
    UpdateThenCreate { missing_status: u16 },
    /// POST the path. Single-segment paths are not writable.
    CreateOnly,
}

/// Executes writes according to a [`WritePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct WriteCoordinator {
    policy: WritePolicy,
}

impl WriteCoordinator {
    pub fn new(policy: WritePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Write `payload` to `path`, returning the payload length on success.
    pub async fn write(
        &self,
        bridge: &dyn Bridge,
        gateway: &Gateway,
        path: &VirtualPath,
        payload: &[u8],
    ) -> VfsResult<u32> {
        let written = u32::try_from(payload.len())
            .map_err(|_| VfsError::invalid_argument(format!("payload too large for {path}")))?;
        let body = (!payload.is_empty()).then_some(payload);

        match self.policy {
            WritePolicy::UpdateThenCreate { missing_status } => {
                let update = bridge.route(path, Operation::Update);
                match gateway.execute(&update, body).await {
                    Ok(_) => {}
                    Err(e) if e.is_status(missing_status) => {
                        let parent = path.parent();
                        tracing::debug!(path = %path, parent = %parent, "update missed, creating in parent");
                        let create = bridge.route(&parent, Operation::Create);
                        gateway.execute(&create, body).await?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            WritePolicy::CreateOnly => {
                if !path.as_str().trim_start_matches(SEPARATOR).contains(SEPARATOR) {
                    return Err(VfsError::not_a_directory(path.as_str()));
                }
                let create = bridge.route(path, Operation::Create);
                gateway.execute(&create, body).await?;
            }
        }

        Ok(written)
    }
}
