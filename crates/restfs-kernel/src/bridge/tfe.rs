//! Terraform Enterprise bridge.
//!
//! Layout:
//!
//! ```text
//! /organizations/<org>/workspaces/<ws>/<plans|applies|state-versions|runs>/<id>
//! /organizations/<org>/workspaces/<ws>/vars
//! /organizations/<org>/<policies|policy-sets|ssh-keys>/<id>
//! ```
//!
//! Everything down to depth 5 is a directory except the variable set and
//! the organization-level objects, which are files.

use super::{Bridge, content_headers};
use crate::classify::PathClassifier;
use crate::listing::{ListingPlan, Shape};
use crate::route::{Operation, Part, Route, Seg, ShapeRule, ShapeTable, Target};
use crate::vfs::VirtualPath;
use crate::write::WritePolicy;

const API_PREFIX: &str = "/api/v2";

const MAX_DIR_DEPTH: usize = 5;

const JSON_API: &str = "application/vnd.api+json";

/// Paths that are files even though they sit at directory depth. Each
/// wildcard matches exactly one segment.
const FILE_PATTERNS: &[&str] = &[
    "/organizations/[^/]+/workspaces/[^/]+/vars",
    "/organizations/[^/]+/policies/[^/]+",
    "/organizations/[^/]+/policy-sets/[^/]+",
    "/organizations/[^/]+/ssh-keys/[^/]+",
];

const ROOT_CHILDREN: &[&str] = &["organizations"];
const ORG_CHILDREN: &[&str] = &["workspaces", "policies", "policy-sets", "ssh-keys"];
const WORKSPACE_CHILDREN: &[&str] = &["plans", "applies", "state-versions", "vars", "runs"];

const IDS: &[Shape] = &[Shape::ArrayOf {
    array: "/data",
    name: "/id",
}];

const NAMES: &[Shape] = &[Shape::ArrayOf {
    array: "/data",
    name: "/attributes/name",
}];

const ORG_OBJECTS: &[&str] = &["policies", "policy-sets", "ssh-keys"];
const BOTH_FILTERS: &[&str] = &["organization", "workspace"];

static RULES: &[ShapeRule] = &[
    // Workspace sub-collections are top-level endpoints filtered by name.
    ShapeRule {
        ops: &[Operation::List],
        shape: &[
            Seg::Lit("organizations"),
            Seg::Any("organization"),
            Seg::Lit("workspaces"),
            Seg::Any("workspace"),
            Seg::Any("collection"),
        ],
        target: Target::Filtered {
            collection: Part::Cap("collection"),
            filters: BOTH_FILTERS,
        },
    },
    ShapeRule {
        ops: &[Operation::Read],
        shape: &[
            Seg::Lit("organizations"),
            Seg::Any("organization"),
            Seg::Lit("workspaces"),
            Seg::Any("workspace"),
            Seg::Lit("vars"),
        ],
        target: Target::Filtered {
            collection: Part::Lit("vars"),
            filters: BOTH_FILTERS,
        },
    },
    ShapeRule {
        ops: &[Operation::Read],
        shape: &[
            Seg::Lit("organizations"),
            Seg::Any("organization"),
            Seg::Lit("workspaces"),
            Seg::Any("workspace"),
            Seg::Any("kind"),
            Seg::Any("id"),
        ],
        target: Target::Instance {
            kind: Part::Cap("kind"),
            id: Part::Cap("id"),
        },
    },
    ShapeRule {
        ops: &[Operation::Read],
        shape: &[
            Seg::Lit("organizations"),
            Seg::Any("organization"),
            Seg::OneOf("kind", ORG_OBJECTS),
            Seg::Any("id"),
        ],
        target: Target::Instance {
            kind: Part::Cap("kind"),
            id: Part::Cap("id"),
        },
    },
];

/// Terraform Enterprise bridge.
#[derive(Debug, Clone)]
pub struct TfeBridge {
    classifier: PathClassifier,
    routes: ShapeTable,
}

impl TfeBridge {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            classifier: PathClassifier::new(MAX_DIR_DEPTH, FILE_PATTERNS)?,
            routes: ShapeTable::new(API_PREFIX, RULES),
        })
    }
}

impl Bridge for TfeBridge {
    fn name(&self) -> &'static str {
        "tfe"
    }

    fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    fn route(&self, path: &VirtualPath, op: Operation) -> Route {
        Route {
            method: op.method(),
            descriptor: self.routes.describe(path, op),
            headers: content_headers(&[("Content-Type", JSON_API)]),
        }
    }

    fn listing(&self, path: &VirtualPath) -> ListingPlan {
        match path.depth() {
            0 => ListingPlan::Static(ROOT_CHILDREN),
            1 => ListingPlan::Fetch(IDS),
            2 => ListingPlan::Static(ORG_CHILDREN),
            3 if path.segment(2) == Some("workspaces") => ListingPlan::Fetch(NAMES),
            3 => ListingPlan::Fetch(IDS),
            4 if path.segment(2) == Some("workspaces") => ListingPlan::Static(WORKSPACE_CHILDREN),
            5 => ListingPlan::Fetch(IDS),
            _ => ListingPlan::Empty,
        }
    }

    fn write_policy(&self) -> WritePolicy {
        WritePolicy::CreateOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Method;
    use crate::vfs::FileType;

    fn bridge() -> TfeBridge {
        TfeBridge::new().unwrap()
    }

    fn url(path: &str, op: Operation) -> String {
        bridge().route(&VirtualPath::new(path), op).url().to_string()
    }

    #[test]
    fn test_depth_classification() {
        let b = bridge();
        for dir in [
            "/",
            "/organizations",
            "/organizations/acme",
            "/organizations/acme/workspaces",
            "/organizations/acme/workspaces/prod",
            "/organizations/acme/workspaces/prod/runs",
        ] {
            assert_eq!(b.classify(&VirtualPath::new(dir)), FileType::Directory, "{dir}");
        }
        assert_eq!(
            b.classify(&VirtualPath::new("/organizations/acme/workspaces/prod/runs/run-1")),
            FileType::File
        );
    }

    #[test]
    fn test_exception_patterns_force_files() {
        let b = bridge();
        for file in [
            "/organizations/acme/workspaces/prod/vars",
            "/organizations/acme/policies/pol-1",
            "/organizations/acme/policy-sets/polset-1",
            "/organizations/acme/ssh-keys/sshkey-1",
        ] {
            assert_eq!(b.classify(&VirtualPath::new(file)), FileType::File, "{file}");
        }
    }

    #[test]
    fn test_workspace_named_like_org_collection() {
        let b = bridge();
        for dir in [
            "/organizations/acme/workspaces/policies",
            "/organizations/acme/workspaces/policies/runs",
            "/organizations/acme/workspaces/ssh-keys/plans",
            "/organizations/policies/workspaces/prod/runs",
        ] {
            assert_eq!(b.classify(&VirtualPath::new(dir)), FileType::Directory, "{dir}");
        }
        assert_eq!(
            b.classify(&VirtualPath::new("/organizations/acme/workspaces/policies/vars")),
            FileType::File
        );
    }

    #[test]
    fn test_list_routes() {
        assert_eq!(url("/organizations", Operation::List), "/api/v2/organizations");
        assert_eq!(
            url("/organizations/acme/workspaces", Operation::List),
            "/api/v2/organizations/acme/workspaces"
        );
        assert_eq!(
            url("/organizations/acme/workspaces/prod/runs", Operation::List),
            "/api/v2/runs?filter[organization][name]=acme&filter[workspace][name]=prod"
        );
    }

    #[test]
    fn test_read_routes() {
        assert_eq!(
            url("/organizations/acme/workspaces/prod/vars", Operation::Read),
            "/api/v2/vars?filter[organization][name]=acme&filter[workspace][name]=prod"
        );
        assert_eq!(
            url("/organizations/acme/workspaces/prod/plans/plan-9", Operation::Read),
            "/api/v2/plans/plan-9"
        );
        assert_eq!(
            url("/organizations/acme/ssh-keys/sshkey-1", Operation::Read),
            "/api/v2/ssh-keys/sshkey-1"
        );
    }

    #[test]
    fn test_writes_pass_through() {
        let b = bridge();
        let route = b.route(&VirtualPath::new("/organizations/acme/workspaces"), Operation::Create);
        assert_eq!(route.method, Method::Post);
        assert_eq!(route.url(), "/api/v2/organizations/acme/workspaces");
        assert_eq!(
            route.headers,
            vec![("Content-Type".to_string(), JSON_API.to_string())]
        );

        let route = b.route(&VirtualPath::new("/organizations/acme/policies/pol-1"), Operation::Delete);
        assert_eq!(route.url(), "/api/v2/organizations/acme/policies/pol-1");
    }

    #[test]
    fn test_listing_plans() {
        let b = bridge();
        let plan = |p: &str| b.listing(&VirtualPath::new(p));
        assert_eq!(plan("/"), ListingPlan::Static(ROOT_CHILDREN));
        assert_eq!(plan("/organizations"), ListingPlan::Fetch(IDS));
        assert_eq!(plan("/organizations/acme"), ListingPlan::Static(ORG_CHILDREN));
        assert_eq!(plan("/organizations/acme/workspaces"), ListingPlan::Fetch(NAMES));
        assert_eq!(plan("/organizations/acme/ssh-keys"), ListingPlan::Fetch(IDS));
        assert_eq!(
            plan("/organizations/acme/workspaces/prod"),
            ListingPlan::Static(WORKSPACE_CHILDREN)
        );
        assert_eq!(plan("/organizations/acme/workspaces/prod/runs"), ListingPlan::Fetch(IDS));
        assert_eq!(plan("/organizations/acme/workspaces/prod/runs/run-1"), ListingPlan::Empty);
    }
}
