//! Core VFS types.
//!
//! Every attribute here is synthetic: the remote service never reports
//! sizes, modes or timestamps, so the kernel fabricates them from the
//! path classification alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Permission bits reported for directories (owner rwx).
pub const DIR_PERM: u32 = 0o700;

/// Permission bits reported for files (owner rw).
pub const FILE_PERM: u32 = 0o600;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file (a remote resource instance).
    File,
    /// Directory (a remote collection or a fixed folder).
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes. Always zero; see direct I/O in the mount layer.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o600).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time.
    pub atime: SystemTime,
    /// Change time.
    pub ctime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
}

impl FileAttr {
    /// Synthetic attributes for a remote resource instance.
    pub fn file() -> Self {
        Self::synthetic(FileType::File)
    }

    /// Synthetic attributes for a collection.
    pub fn directory() -> Self {
        Self::synthetic(FileType::Directory)
    }

    /// Synthetic attributes for the given kind, timestamped now.
    pub fn synthetic(kind: FileType) -> Self {
        let now = SystemTime::now();
        let (perm, nlink) = match kind {
            FileType::File => (FILE_PERM, 1),
            FileType::Directory => (DIR_PERM, 2), // . and ..
        };
        Self {
            size: 0,
            kind,
            perm,
            mtime: now,
            atime: now,
            ctime: now,
            nlink,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Attributes to set (for setattr operation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetAttr {
    /// New size (truncate/extend).
    pub size: Option<u64>,
    /// New permissions.
    pub perm: Option<u32>,
    /// New modification time.
    pub mtime: Option<SystemTime>,
}

impl SetAttr {
    /// Create a new empty SetAttr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set permissions.
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }
}

/// Filesystem statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFs {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Available blocks (to non-root).
    pub bavail: u64,
    /// Total inodes.
    pub files: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

impl Default for StatFs {
    /// Fixed synthetic capacity. Nothing here reflects the remote service.
    fn default() -> Self {
        Self {
            blocks: 32768,
            bfree: 15,
            bavail: 32768,
            files: 15,
            ffree: 10000,
            bsize: 32768,
            namelen: 0xFFFF,
            frsize: 32768,
        }
    }
}

/// Identity of one open file.
///
/// Read buffers are keyed by handle, so two opens of the same path never
/// share a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileHandle(pub u64);

impl FileHandle {
    /// Raw handle value, as handed to the kernel's FUSE layer.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fh#{}", self.0)
    }
}
