//! VFS operations trait.
//!
//! This trait defines the filesystem operations the interface layer calls
//! (path-based, explicit offset/size). Reads additionally carry the
//! [`FileHandle`] issued by `open`, which keys the read buffer.

use async_trait::async_trait;

use super::path::VirtualPath;
use super::types::{DirEntry, FileAttr, FileHandle, SetAttr, StatFs};
use super::VfsResult;

/// Core VFS operations trait.
///
/// All operations are path-based (no inode numbers). The FUSE layer
/// handles inode ↔ path mapping locally.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes. Must answer without touching the network.
    async fn getattr(&self, path: &VirtualPath) -> VfsResult<FileAttr>;

    /// Read directory entries (no pagination).
    async fn readdir(&self, path: &VirtualPath) -> VfsResult<Vec<DirEntry>>;

    /// Open a file for reading or writing and return its handle.
    async fn open(&self, path: &VirtualPath) -> VfsResult<FileHandle>;

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// An empty result signals end of file.
    async fn read(
        &self,
        handle: FileHandle,
        path: &VirtualPath,
        offset: u64,
        size: u32,
    ) -> VfsResult<Vec<u8>>;

    /// Forget any state held for `handle`.
    async fn release(&self, handle: FileHandle) -> VfsResult<()>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write `data` to the resource at `path`.
    ///
    /// Returns the number of bytes accepted.
    async fn write(&self, path: &VirtualPath, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create a new file, returning its attributes and an open handle.
    async fn create(&self, path: &VirtualPath, mode: u32) -> VfsResult<(FileAttr, FileHandle)>;

    /// Create a new directory.
    async fn mkdir(&self, path: &VirtualPath, mode: u32) -> VfsResult<FileAttr>;

    /// Remove a file.
    async fn unlink(&self, path: &VirtualPath) -> VfsResult<()>;

    /// Remove a directory.
    async fn rmdir(&self, path: &VirtualPath) -> VfsResult<()>;

    /// Truncate a file to the specified size.
    async fn truncate(&self, path: &VirtualPath, size: u64) -> VfsResult<()>;

    /// Set file attributes.
    async fn setattr(&self, path: &VirtualPath, attr: SetAttr) -> VfsResult<FileAttr>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Get filesystem statistics.
    async fn statfs(&self) -> VfsResult<StatFs>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Read a whole file through a short-lived handle.
    ///
    /// Follows the same protocol an unbuffered mount does: read at
    /// increasing offsets until an empty chunk comes back.
    async fn read_all(&self, path: &VirtualPath) -> VfsResult<Vec<u8>> {
        const CHUNK: u32 = 64 * 1024;

        let handle = self.open(path).await?;
        let mut data = Vec::new();
        let result = loop {
            match self.read(handle, path, data.len() as u64, CHUNK).await {
                Ok(chunk) if chunk.is_empty() => break Ok(()),
                Ok(chunk) => data.extend_from_slice(&chunk),
                Err(e) => break Err(e),
            }
        };
        self.release(handle).await?;
        result.map(|()| data)
    }
}
