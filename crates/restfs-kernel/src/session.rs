//! Read sessions.
//!
//! File size is unknown until the body is fetched, so an unbuffered mount
//! reads at increasing offsets until it gets zero bytes back. The first
//! read on a handle fetches the whole body once; later reads slice it.
//! Reading at or past the end drops the buffer and returns nothing, which
//! the mount takes as end of file.
//!
//! Buffers are keyed by the [`FileHandle`] issued at open, so concurrent
//! readers of different (or the same) paths never see each other's data.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::gateway::GatewayError;
use crate::vfs::{FileHandle, VfsError, VfsResult, VirtualPath};

/// A fetched body waiting to be drained.
#[derive(Debug, Clone)]
struct ReadBuffer {
    path: VirtualPath,
    body: Vec<u8>,
}

/// Handle-keyed table of read buffers.
#[derive(Debug)]
pub struct ReadSessions {
    buffers: DashMap<FileHandle, ReadBuffer>,
    next_handle: AtomicU64,
}

impl Default for ReadSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadSessions {
    pub fn new() -> Self {
        Self {
            buffers: DashMap::new(),
            // 0 is left unused so a zeroed handle is never live.
            next_handle: AtomicU64::new(1),
        }
    }

    /// Issue a fresh handle. No buffer exists until the first read.
    pub fn open(&self) -> FileHandle {
        FileHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Serve `size` bytes at `offset` for `handle`, calling `fetch` when
    /// the handle has no buffer for `path` yet.
    pub async fn read<F, Fut>(
        &self,
        handle: FileHandle,
        path: &VirtualPath,
        offset: u64,
        size: u32,
        fetch: F,
    ) -> VfsResult<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, GatewayError>>,
    {
        let buffered = self
            .buffers
            .get(&handle)
            .is_some_and(|entry| entry.path == *path);

        if !buffered {
            // No map guard is held across the fetch.
            let body = fetch().await.map_err(|e| {
                tracing::debug!(%handle, path = %path, error = %e, "read fetch failed");
                VfsError::not_found(path.as_str())
            })?;
            tracing::debug!(%handle, path = %path, len = body.len(), "buffered read body");
            self.buffers.insert(
                handle,
                ReadBuffer {
                    path: path.clone(),
                    body,
                },
            );
        }

        let chunk = match self.buffers.get(&handle) {
            Some(entry) => slice(&entry.body, offset, size),
            None => None,
        };

        match chunk {
            Some(bytes) => Ok(bytes),
            None => {
                self.buffers.remove(&handle);
                Ok(Vec::new())
            }
        }
    }

    /// Drop whatever `handle` buffered.
    pub fn release(&self, handle: FileHandle) {
        self.buffers.remove(&handle);
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Bytes `[offset, offset + min(size, available))`, or `None` once
/// nothing is available.
fn slice(body: &[u8], offset: u64, size: u32) -> Option<Vec<u8>> {
    let offset = usize::try_from(offset).ok()?;
    let available = body.len().checked_sub(offset).filter(|n| *n > 0)?;
    let take = available.min(size as usize);
    Some(body[offset..offset + take].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::TransportError;
    use crate::route::Method;
    use std::sync::atomic::AtomicUsize;

    fn ok(body: &'static [u8]) -> impl Future<Output = Result<Vec<u8>, GatewayError>> {
        std::future::ready(Ok(body.to_vec()))
    }

    #[tokio::test]
    async fn test_two_call_protocol() {
        let sessions = ReadSessions::new();
        let h = sessions.open();
        let path = VirtualPath::new("/default/pods/web");

        let first = sessions.read(h, &path, 0, 4096, || ok(b"hello")).await.unwrap();
        assert_eq!(first, b"hello");
        assert_eq!(sessions.len(), 1);

        let second = sessions
            .read(h, &path, 5, 4096, || async { panic!("refetched") })
            .await
            .unwrap();
        assert!(second.is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_chunked_reads_fetch_once() {
        let sessions = ReadSessions::new();
        let h = sessions.open();
        let path = VirtualPath::new("/f");
        let fetches = AtomicUsize::new(0);

        let mut out = Vec::new();
        loop {
            let chunk = sessions
                .read(h, &path, out.len() as u64, 3, || {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    ok(b"0123456789")
                })
                .await
                .unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend(chunk);
        }
        assert_eq!(out, b"0123456789");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_found_and_keeps_nothing() {
        let sessions = ReadSessions::new();
        let h = sessions.open();
        let path = VirtualPath::new("/missing");

        let err = sessions
            .read(h, &path, 0, 10, || async {
                Err(GatewayError::Transport {
                    method: Method::Get,
                    url: "http://x/missing".into(),
                    source: TransportError::Connect("refused".into()),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_handles_are_isolated() {
        let sessions = ReadSessions::new();
        let a = sessions.open();
        let b = sessions.open();
        assert_ne!(a, b);

        let pa = VirtualPath::new("/a");
        let pb = VirtualPath::new("/b");
        sessions.read(a, &pa, 0, 1, || ok(b"AAAA")).await.unwrap();
        sessions.read(b, &pb, 0, 1, || ok(b"BBBB")).await.unwrap();

        let next_a = sessions.read(a, &pa, 1, 10, || ok(b"xxxx")).await.unwrap();
        assert_eq!(next_a, b"AAA");
        let next_b = sessions.read(b, &pb, 1, 10, || ok(b"xxxx")).await.unwrap();
        assert_eq!(next_b, b"BBB");
    }

    #[tokio::test]
    async fn test_release_drops_buffer() {
        let sessions = ReadSessions::new();
        let h = sessions.open();
        let path = VirtualPath::new("/f");
        sessions.read(h, &path, 0, 1, || ok(b"abc")).await.unwrap();
        assert_eq!(sessions.len(), 1);
        sessions.release(h);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_ends_immediately() {
        let sessions = ReadSessions::new();
        let h = sessions.open();
        let chunk = sessions
            .read(h, &VirtualPath::new("/e"), 0, 10, || ok(b""))
            .await
            .unwrap();
        assert!(chunk.is_empty());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_slice_bounds() {
        assert_eq!(slice(b"abcdef", 2, 2), Some(b"cd".to_vec()));
        assert_eq!(slice(b"abcdef", 4, 100), Some(b"ef".to_vec()));
        assert_eq!(slice(b"abcdef", 6, 1), None);
        assert_eq!(slice(b"abcdef", 600, 1), None);
    }
}
