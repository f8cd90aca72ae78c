//! FUSE front end for restfs-kernel.

pub mod fuse;
pub mod inodes;
pub mod logging;

pub use fuse::{MountFlags, RestFuse, errno};
pub use inodes::{InodeTable, ROOT_INODE};
