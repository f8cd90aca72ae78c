//! REST-backed filesystem.
//!
//! [`RestBackend`] implements [`VfsOps`] by composing a [`Bridge`] (pure
//! classification, routing and listing rules) with a [`Gateway`] (the HTTP
//! calls), the handle-keyed [`ReadSessions`] and a [`WriteCoordinator`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::config::{BridgeConfig, ConfigError};
use crate::gateway::Gateway;
use crate::listing::{self, ListingPlan};
use crate::route::Operation;
use crate::session::ReadSessions;
use crate::vfs::{
    DirEntry, FileAttr, FileHandle, FileType, SetAttr, StatFs, VfsError, VfsOps, VfsResult,
    VirtualPath,
};
use crate::write::WriteCoordinator;

/// A remote REST API seen as a filesystem.
#[derive(Debug)]
pub struct RestBackend {
    bridge: Arc<dyn Bridge>,
    gateway: Gateway,
    sessions: ReadSessions,
    writer: WriteCoordinator,
}

impl RestBackend {
    /// Combine a bridge with a gateway.
    pub fn new(bridge: Arc<dyn Bridge>, gateway: Gateway) -> Self {
        let writer = WriteCoordinator::new(bridge.write_policy());
        Self {
            bridge,
            gateway,
            sessions: ReadSessions::new(),
            writer,
        }
    }

    /// Build the bridge and production gateway described by `config`.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, ConfigError> {
        let bridge = config.build_bridge()?;
        let gateway = config.build_gateway()?;
        tracing::info!(
            bridge = bridge.name(),
            base_url = gateway.base_url(),
            serialized = config.serialize_requests,
            "backend ready"
        );
        Ok(Self::new(bridge, gateway))
    }

    pub fn bridge(&self) -> &dyn Bridge {
        self.bridge.as_ref()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Number of handles currently holding a read buffer.
    pub fn open_buffers(&self) -> usize {
        self.sessions.len()
    }

    fn require_file(&self, path: &VirtualPath) -> VfsResult<()> {
        match self.bridge.classify(path) {
            FileType::File => Ok(()),
            FileType::Directory => Err(VfsError::is_a_directory(path.as_str())),
        }
    }

    async fn fetch_names(&self, path: &VirtualPath, plan: ListingPlan) -> VfsResult<Vec<String>> {
        match plan {
            ListingPlan::Static(names) => Ok(listing::static_names(names)),
            ListingPlan::Empty => Ok(Vec::new()),
            ListingPlan::Fetch(shapes) => {
                let route = self.bridge.route(path, Operation::List);
                let body = self.gateway.execute(&route, None).await?;
                listing::synthesize(&body, shapes).map_err(|e| {
                    tracing::warn!(path = %path, url = route.url(), error = %e, "unparseable listing");
                    VfsError::invalid_argument(format!("{path}: {e}"))
                })
            }
        }
    }

    async fn delete(&self, path: &VirtualPath) -> VfsResult<()> {
        let route = self.bridge.route(path, Operation::Delete);
        self.gateway.execute(&route, None).await?;
        Ok(())
    }
}

#[async_trait]
impl VfsOps for RestBackend {
    async fn getattr(&self, path: &VirtualPath) -> VfsResult<FileAttr> {
        Ok(FileAttr::synthetic(self.bridge.classify(path)))
    }

    async fn readdir(&self, path: &VirtualPath) -> VfsResult<Vec<DirEntry>> {
        if self.bridge.classify(path).is_file() {
            return Err(VfsError::not_a_directory(path.as_str()));
        }

        let names = self.fetch_names(path, self.bridge.listing(path)).await?;
        tracing::debug!(path = %path, count = names.len(), "listed");

        Ok(names
            .into_iter()
            .map(|name| {
                let kind = self.bridge.classify(&path.join(&name));
                DirEntry::new(name, kind)
            })
            .collect())
    }

    async fn open(&self, path: &VirtualPath) -> VfsResult<FileHandle> {
        self.require_file(path)?;
        let handle = self.sessions.open();
        tracing::trace!(%handle, path = %path, "opened");
        Ok(handle)
    }

    async fn read(
        &self,
        handle: FileHandle,
        path: &VirtualPath,
        offset: u64,
        size: u32,
    ) -> VfsResult<Vec<u8>> {
        self.require_file(path)?;
        let route = self.bridge.route(path, Operation::Read);
        self.sessions
            .read(handle, path, offset, size, || self.gateway.execute(&route, None))
            .await
    }

    async fn release(&self, handle: FileHandle) -> VfsResult<()> {
        self.sessions.release(handle);
        Ok(())
    }

    async fn write(&self, path: &VirtualPath, offset: u64, data: &[u8]) -> VfsResult<u32> {
        if offset != 0 {
            tracing::debug!(path = %path, offset, "write replaces the whole resource");
        }
        self.writer
            .write(self.bridge.as_ref(), &self.gateway, path, data)
            .await
    }

    async fn create(&self, path: &VirtualPath, _mode: u32) -> VfsResult<(FileAttr, FileHandle)> {
        self.require_file(path)?;
        // Nothing exists remotely until the first write.
        Ok((FileAttr::file(), self.sessions.open()))
    }

    async fn mkdir(&self, path: &VirtualPath, _mode: u32) -> VfsResult<FileAttr> {
        let dir = path.with_trailing_separator();
        self.writer
            .write(self.bridge.as_ref(), &self.gateway, &dir, &[])
            .await?;
        Ok(FileAttr::directory())
    }

    async fn unlink(&self, path: &VirtualPath) -> VfsResult<()> {
        self.delete(path).await
    }

    async fn rmdir(&self, path: &VirtualPath) -> VfsResult<()> {
        self.delete(path).await
    }

    async fn truncate(&self, _path: &VirtualPath, _size: u64) -> VfsResult<()> {
        Ok(())
    }

    async fn setattr(&self, path: &VirtualPath, _attr: SetAttr) -> VfsResult<FileAttr> {
        self.getattr(path).await
    }

    fn read_only(&self) -> bool {
        false
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(self.bridge.statfs())
    }
}
