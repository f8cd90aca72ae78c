//! Kubernetes API server bridge.
//!
//! Layout: `/<namespace>/<kind>/<name>`. The first two levels are
//! directories; objects are files holding their JSON.

use super::{Bridge, content_headers};
use crate::classify::PathClassifier;
use crate::constants::KUBE_MISSING_STATUS;
use crate::listing::{ListingPlan, Shape};
use crate::route::{Operation, PrefixTable, Route};
use crate::vfs::VirtualPath;
use crate::write::WritePolicy;

const CORE_PREFIX: &str = "/api/v1/namespaces";
const APPS_PREFIX: &str = "/apis/apps/v1/namespaces";
const BATCH_BETA_PREFIX: &str = "/apis/batch/v1beta1/namespaces";
const BATCH_PREFIX: &str = "/apis/batch/v1/namespaces";

const MAX_DIR_DEPTH: usize = 2;

/// Segment holding the resource kind.
const KIND_SEGMENT: usize = 1;

const JSON: &str = "application/json";
const TABLE: &str = "application/json;as=Table;g=meta.k8s.io;v=v1beta1";

/// Resource kinds listed under every namespace.
pub const KINDS: &[&str] = &[
    "pods",
    "services",
    "deployments",
    "daemonsets",
    "replicasets",
    "cronjobs",
    "jobs",
];

/// Table representation first, plain list as fallback.
const OBJECT_NAMES: &[Shape] = &[
    Shape::ArrayOf {
        array: "/rows",
        name: "/object/metadata/name",
    },
    Shape::ArrayOf {
        array: "/items",
        name: "/metadata/name",
    },
];

/// Kubernetes bridge.
#[derive(Debug, Clone)]
pub struct KubeBridge {
    classifier: PathClassifier,
    prefixes: PrefixTable,
    kind_aware_delete: bool,
}

impl Default for KubeBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl KubeBridge {
    pub fn new() -> Self {
        let prefixes = PrefixTable::new(KIND_SEGMENT, CORE_PREFIX)
            .with_rule("deployments", APPS_PREFIX)
            .with_rule("daemonsets", APPS_PREFIX)
            .with_rule("replicasets", APPS_PREFIX)
            .with_rule("cronjobs", BATCH_BETA_PREFIX)
            .with_rule("jobs", BATCH_PREFIX);
        Self {
            classifier: PathClassifier::depth_only(MAX_DIR_DEPTH),
            prefixes,
            kind_aware_delete: false,
        }
    }

    /// Route deletes by kind instead of always to the core prefix.
    pub fn with_kind_aware_delete(mut self, enabled: bool) -> Self {
        self.kind_aware_delete = enabled;
        self
    }

    fn prefix(&self, path: &VirtualPath, op: Operation) -> &str {
        let by_kind = self.prefixes.prefix_for(path);
        if op == Operation::Delete && !self.kind_aware_delete {
            if by_kind != self.prefixes.default_prefix() {
                tracing::debug!(path = %path, prefix = by_kind, "delete sent to core prefix");
            }
            return self.prefixes.default_prefix();
        }
        by_kind
    }
}

impl Bridge for KubeBridge {
    fn name(&self) -> &'static str {
        "kube"
    }

    fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    fn route(&self, path: &VirtualPath, op: Operation) -> Route {
        let mut descriptor = self.prefixes.describe(self.prefix(path, op), path);
        if op == Operation::Read {
            descriptor.url.push_str("?pretty=true");
        }

        let headers = match op {
            Operation::Create | Operation::Update => content_headers(&[("Content-Type", JSON)]),
            Operation::List => content_headers(&[("Accept", TABLE)]),
            Operation::Read | Operation::Delete => Vec::new(),
        };

        Route {
            method: op.method(),
            descriptor,
            headers,
        }
    }

    fn listing(&self, path: &VirtualPath) -> ListingPlan {
        match path.depth() {
            0 | 2 => ListingPlan::Fetch(OBJECT_NAMES),
            1 => ListingPlan::Static(KINDS),
            _ => ListingPlan::Empty,
        }
    }

    fn write_policy(&self) -> WritePolicy {
        WritePolicy::UpdateThenCreate {
            missing_status: KUBE_MISSING_STATUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Method;
    use crate::vfs::FileType;

    fn url(bridge: &KubeBridge, path: &str, op: Operation) -> String {
        bridge.route(&VirtualPath::new(path), op).url().to_string()
    }

    #[test]
    fn test_classification() {
        let b = KubeBridge::new();
        assert_eq!(b.classify(&VirtualPath::root()), FileType::Directory);
        assert_eq!(b.classify(&VirtualPath::new("/default")), FileType::Directory);
        assert_eq!(b.classify(&VirtualPath::new("/default/pods")), FileType::Directory);
        assert_eq!(b.classify(&VirtualPath::new("/default/pods/web")), FileType::File);
    }

    #[test]
    fn test_kind_prefixes() {
        let b = KubeBridge::new();
        assert_eq!(
            url(&b, "/default/deployments/web", Operation::Update),
            "/apis/apps/v1/namespaces/default/deployments/web"
        );
        assert_eq!(
            url(&b, "/default/daemonsets", Operation::List),
            "/apis/apps/v1/namespaces/default/daemonsets"
        );
        assert_eq!(
            url(&b, "/ops/cronjobs/nightly", Operation::Update),
            "/apis/batch/v1beta1/namespaces/ops/cronjobs/nightly"
        );
        assert_eq!(
            url(&b, "/ops/jobs", Operation::List),
            "/apis/batch/v1/namespaces/ops/jobs"
        );
        assert_eq!(
            url(&b, "/default/services/api", Operation::Update),
            "/api/v1/namespaces/default/services/api"
        );
        assert_eq!(url(&b, "/", Operation::List), "/api/v1/namespaces");
    }

    #[test]
    fn test_read_asks_for_pretty_json() {
        let b = KubeBridge::new();
        let route = b.route(&VirtualPath::new("/default/pods/web"), Operation::Read);
        assert_eq!(route.method, Method::Get);
        assert_eq!(route.url(), "/api/v1/namespaces/default/pods/web?pretty=true");
        assert!(route.headers.is_empty());
    }

    #[test]
    fn test_delete_targets_core_prefix() {
        let b = KubeBridge::new();
        assert_eq!(
            url(&b, "/pods/default/nginx", Operation::Delete),
            "/api/v1/namespaces/pods/default/nginx"
        );
        assert_eq!(
            url(&b, "/default/deployments/nginx", Operation::Delete),
            "/api/v1/namespaces/default/deployments/nginx"
        );
    }

    #[test]
    fn test_kind_aware_delete() {
        let b = KubeBridge::new().with_kind_aware_delete(true);
        let route = b.route(&VirtualPath::new("/default/deployments/nginx"), Operation::Delete);
        assert_eq!(route.method, Method::Delete);
        assert_eq!(route.url(), "/apis/apps/v1/namespaces/default/deployments/nginx");
    }

    #[test]
    fn test_headers() {
        let b = KubeBridge::new();
        let list = b.route(&VirtualPath::new("/default/pods"), Operation::List);
        assert_eq!(list.headers, vec![("Accept".to_string(), TABLE.to_string())]);

        let create = b.route(&VirtualPath::new("/default/pods"), Operation::Create);
        assert_eq!(create.method, Method::Post);
        assert_eq!(create.headers, vec![("Content-Type".to_string(), JSON.to_string())]);
    }

    #[test]
    fn test_listing_plans() {
        let b = KubeBridge::new();
        assert_eq!(b.listing(&VirtualPath::root()), ListingPlan::Fetch(OBJECT_NAMES));
        assert_eq!(b.listing(&VirtualPath::new("/pods")), ListingPlan::Static(KINDS));
        assert_eq!(
            b.listing(&VirtualPath::new("/default/pods")),
            ListingPlan::Fetch(OBJECT_NAMES)
        );
        assert_eq!(b.listing(&VirtualPath::new("/default/pods/web")), ListingPlan::Empty);
    }

    #[test]
    fn test_write_policy() {
        assert_eq!(
            KubeBridge::new().write_policy(),
            WritePolicy::UpdateThenCreate { missing_status: 400 }
        );
    }
}
