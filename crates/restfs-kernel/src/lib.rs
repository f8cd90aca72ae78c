//! # restfs-kernel
//!
//! Path-to-resource translation core for mounting REST APIs as filesystems.
//!
//! A mount is a tree of synthetic nodes. Each node is a path, and the path
//! alone decides:
//! - Whether the node is a directory (collection) or a file (resource)
//! - Which HTTP method and URL an operation on it becomes
//! - Where its directory listing comes from (fixed names or a response body)
//!
//! Two bridges ship with the kernel: Kubernetes ([`KubeBridge`]) and
//! Terraform Enterprise ([`TfeBridge`]). [`RestBackend`] ties a bridge to
//! a [`Gateway`] and implements [`VfsOps`] for the mount layer.

pub mod backend;
pub mod bridge;
pub mod classify;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod listing;
pub mod route;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod vfs;
pub mod write;

pub use backend::RestBackend;
pub use bridge::{Bridge, KubeBridge, TfeBridge};
pub use classify::PathClassifier;
pub use config::{BridgeConfig, BridgeKind, ConfigError};
pub use gateway::{
    Gateway, GatewayError, HttpRequest, HttpResponse, ReqwestTransport, Transport,
    TransportBuildError, TransportError,
};
pub use listing::{ListingPlan, Shape};
pub use route::{Method, Operation, ResourceDescriptor, Route};
pub use session::ReadSessions;
pub use vfs::{
    DirEntry, FileAttr, FileHandle, FileType, SetAttr, StatFs, VfsError, VfsOps, VfsResult,
    VirtualPath,
};
pub use write::{WriteCoordinator, WritePolicy};
