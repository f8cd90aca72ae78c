//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
///
/// Remote rejections surface as `NotFound` (reads) or `InvalidArgument`
/// (listings, writes, deletes); a call that never reached the service is
/// `Transport`. None of these are fatal to the mount.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Resource not found (or the fetch backing a read failed).
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote service rejected the request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The HTTP call could not be completed (refused, timed out, TLS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::Transport(msg) => io::Error::other(msg),
            VfsError::Io(e) => e,
            VfsError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let e: io::Error = VfsError::not_found("/default/pods/x").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::invalid_argument("HTTP 422").into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let e: io::Error = VfsError::not_a_directory("/a").into();
        assert_eq!(e.kind(), io::ErrorKind::NotADirectory);

        let e: io::Error = VfsError::transport("connection refused").into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            VfsError::not_found("/x").to_string(),
            "not found: /x"
        );
        assert_eq!(
            VfsError::transport("timed out").to_string(),
            "transport failure: timed out"
        );
    }
}
