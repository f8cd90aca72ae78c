//! Virtual Filesystem abstraction.
//!
//! This module provides the path-based VFS surface the mount layer talks to.
//! Key components:
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`VirtualPath`] - Slash-delimited node names; depth drives classification
//! - [`FileAttr`], [`StatFs`] - Synthetic metadata
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   FUSE clients handle inode ↔ path mapping locally.
//! - **Handle-keyed reads**: Read buffers belong to a [`FileHandle`], not to
//!   "the last path read".

mod error;
mod ops;
mod path;
mod types;

pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use path::{SEPARATOR, VirtualPath};
pub use types::{DIR_PERM, DirEntry, FILE_PERM, FileAttr, FileHandle, FileType, SetAttr, StatFs};
