//! Bridges: one per remote API hierarchy.
//!
//! A bridge is pure configuration of the translation core. It answers
//! classification, routing and listing questions without doing any I/O;
//! [`RestBackend`](crate::backend::RestBackend) performs the calls.

mod kube;
mod tfe;

pub use kube::KubeBridge;
pub use tfe::TfeBridge;

use crate::classify::PathClassifier;
use crate::listing::ListingPlan;
use crate::route::{Operation, Route};
use crate::vfs::{FileType, StatFs, VirtualPath};
use crate::write::WritePolicy;

/// Per-API translation rules.
pub trait Bridge: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Directory-vs-file rules for this hierarchy.
    fn classifier(&self) -> &PathClassifier;

    /// Classify `path` (never touches the network).
    fn classify(&self, path: &VirtualPath) -> FileType {
        self.classifier().classify(path)
    }

    /// Method, URL and content headers for `op` on `path`.
    fn route(&self, path: &VirtualPath, op: Operation) -> Route;

    /// Where the children of directory `path` come from.
    fn listing(&self, path: &VirtualPath) -> ListingPlan;

    /// How writes reach the remote service.
    fn write_policy(&self) -> WritePolicy;

    /// Synthetic filesystem statistics.
    fn statfs(&self) -> StatFs {
        StatFs::default()
    }
}

/// Content headers as owned pairs.
pub(crate) fn content_headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
