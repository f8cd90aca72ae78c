//! Endpoint routing.
//!
//! Routing turns a path plus a filesystem operation into an HTTP method,
//! URL and header set. It is deterministic and total: every path yields a
//! URL, and whether the resource exists is for the HTTP call to find out.
//!
//! Two declarative building blocks cover the bridges:
//!
//! - [`PrefixTable`] picks an API version prefix from the resource kind
//!   found at a fixed segment position, falling back to a default prefix.
//! - [`ShapeTable`] matches whole path shapes (literal and captured
//!   segments) and builds the URL from the captures, including
//!   `filter[..][name]=..` query qualifiers for collection endpoints.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::vfs::VirtualPath;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Filesystem-level operation being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Directory listing.
    List,
    /// File read.
    Read,
    /// Create a new resource in a collection.
    Create,
    /// Replace an existing resource.
    Update,
    /// Remove a resource.
    Delete,
}

impl Operation {
    /// The HTTP method this operation maps to.
    pub fn method(self) -> Method {
        match self {
            Operation::List | Operation::Read => Method::Get,
            Operation::Create => Method::Post,
            Operation::Update => Method::Put,
            Operation::Delete => Method::Delete,
        }
    }
}

/// What a path resolved to on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// API version prefix (e.g. `/apis/apps/v1/namespaces`).
    pub prefix: String,
    /// Resource kind, when the path names one.
    pub kind: Option<String>,
    /// Positional qualifiers (organization, workspace, ...).
    pub qualifiers: Vec<(String, String)>,
    /// URL relative to the API base address.
    pub url: String,
}

impl ResourceDescriptor {
    /// Look up a qualifier by name.
    pub fn qualifier(&self, name: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully routed request, minus the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// Remote resource.
    pub descriptor: ResourceDescriptor,
    /// Content headers (auth is added by the gateway).
    pub headers: Vec<(String, String)>,
}

impl Route {
    /// URL relative to the API base address.
    pub fn url(&self) -> &str {
        &self.descriptor.url
    }
}

/// Build a `?filter[k][name]=v&...` query string from qualifiers.
pub fn filter_query(qualifiers: &[(String, String)]) -> String {
    let pairs: Vec<String> = qualifiers
        .iter()
        .map(|(k, v)| format!("filter[{k}][name]={v}"))
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

// ============================================================================
// Prefix table
// ============================================================================

/// Kind → prefix rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    /// Resource kind as it appears in the path.
    pub kind: String,
    /// API version prefix for that kind.
    pub prefix: String,
}

impl PrefixRule {
    pub fn new(kind: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            prefix: prefix.into(),
        }
    }
}

/// Selects an API prefix by the kind segment of a path.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    kind_segment: usize,
    default_prefix: String,
    rules: Vec<PrefixRule>,
}

impl PrefixTable {
    /// Create a table reading the kind from segment `kind_segment` (0-based).
    pub fn new(kind_segment: usize, default_prefix: impl Into<String>) -> Self {
        Self {
            kind_segment,
            default_prefix: default_prefix.into(),
            rules: Vec::new(),
        }
    }

    /// Add a rule.
    pub fn with_rule(mut self, kind: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.rules.push(PrefixRule::new(kind, prefix));
        self
    }

    /// The fallback prefix.
    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// The kind segment of `path`, if the path is deep enough.
    pub fn kind_of<'a>(&self, path: &'a VirtualPath) -> Option<&'a str> {
        path.segment(self.kind_segment)
    }

    /// Prefix for `path`: the matching rule's, or the default.
    pub fn prefix_for(&self, path: &VirtualPath) -> &str {
        let Some(kind) = self.kind_of(path) else {
            return &self.default_prefix;
        };
        match self.rules.iter().find(|r| r.kind == kind) {
            Some(rule) => &rule.prefix,
            None => {
                tracing::trace!(path = %path, kind, "no prefix rule, using default");
                &self.default_prefix
            }
        }
    }

    /// Descriptor for `prefix + path`.
    pub fn describe(&self, prefix: &str, path: &VirtualPath) -> ResourceDescriptor {
        ResourceDescriptor {
            prefix: prefix.to_string(),
            kind: self.kind_of(path).map(str::to_string),
            qualifiers: Vec::new(),
            url: format!("{prefix}{}", path.url_suffix()),
        }
    }
}

// ============================================================================
// Shape table
// ============================================================================

/// One segment of a path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg {
    /// Exactly this text.
    Lit(&'static str),
    /// Any non-empty segment, captured under the given name.
    Any(&'static str),
    /// One of the listed texts, captured under the given name.
    OneOf(&'static str, &'static [&'static str]),
}

/// A URL part: literal text or a named capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Lit(&'static str),
    Cap(&'static str),
}

/// How a matched shape becomes a URL (below the table prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `prefix + path`.
    Passthrough,
    /// `prefix/<kind>/<id>`.
    Instance { kind: Part, id: Part },
    /// `prefix/<collection>?filter[q][name]=..` for each named qualifier.
    Filtered {
        collection: Part,
        filters: &'static [&'static str],
    },
}

/// A shape rule: which operations it applies to, the shape, the target.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRule {
    pub ops: &'static [Operation],
    pub shape: &'static [Seg],
    pub target: Target,
}

type Captures = Vec<(&'static str, String)>;

fn capture<'a>(caps: &'a Captures, name: &str) -> &'a str {
    caps.iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

fn resolve(part: Part, caps: &Captures) -> String {
    match part {
        Part::Lit(s) => s.to_string(),
        Part::Cap(name) => capture(caps, name).to_string(),
    }
}

/// Match `path` against `shape`, returning captures on success.
fn match_shape(path: &VirtualPath, shape: &[Seg]) -> Option<Captures> {
    let segments: Vec<&str> = path.segments().collect();
    if segments.len() != shape.len() {
        return None;
    }
    let mut caps = Vec::new();
    for (seg, rule) in segments.iter().zip(shape) {
        match *rule {
            Seg::Lit(text) if *seg == text => {}
            Seg::Lit(_) => return None,
            Seg::Any(name) => caps.push((name, seg.to_string())),
            Seg::OneOf(name, options) if options.contains(seg) => {
                caps.push((name, seg.to_string()))
            }
            Seg::OneOf(..) => return None,
        }
    }
    Some(caps)
}

/// Ordered list of shape rules under one API prefix.
#[derive(Debug, Clone)]
pub struct ShapeTable {
    prefix: String,
    rules: &'static [ShapeRule],
}

impl ShapeTable {
    pub fn new(prefix: impl Into<String>, rules: &'static [ShapeRule]) -> Self {
        Self {
            prefix: prefix.into(),
            rules,
        }
    }

    /// The API prefix every URL starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolve `path` for `op`. The first matching rule wins; no match is
    /// a passthrough to `prefix + path`.
    pub fn describe(&self, path: &VirtualPath, op: Operation) -> ResourceDescriptor {
        for rule in self.rules.iter().filter(|r| r.ops.contains(&op)) {
            if let Some(caps) = match_shape(path, rule.shape) {
                return self.build(path, rule.target, &caps);
            }
        }
        tracing::trace!(path = %path, %op, "no shape matched, passing through");
        self.build(path, Target::Passthrough, &Vec::new())
    }

    fn build(&self, path: &VirtualPath, target: Target, caps: &Captures) -> ResourceDescriptor {
        let qualifiers: Vec<(String, String)> = caps
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let (kind, url) = match target {
            Target::Passthrough => (None, format!("{}{}", self.prefix, path.url_suffix())),
            Target::Instance { kind, id } => {
                let kind = resolve(kind, caps);
                let url = format!("{}/{}/{}", self.prefix, kind, resolve(id, caps));
                (Some(kind), url)
            }
            Target::Filtered {
                collection,
                filters,
            } => {
                let kind = resolve(collection, caps);
                let filter_pairs: Vec<(String, String)> = filters
                    .iter()
                    .map(|name| (name.to_string(), capture(caps, name).to_string()))
                    .collect();
                let url = format!("{}/{}{}", self.prefix, kind, filter_query(&filter_pairs));
                (Some(kind), url)
            }
        };
        ResourceDescriptor {
            prefix: self.prefix.clone(),
            kind,
            qualifiers,
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::List.method(), Method::Get);
        assert_eq!(Operation::Read.method(), Method::Get);
        assert_eq!(Operation::Create.method(), Method::Post);
        assert_eq!(Operation::Update.method(), Method::Put);
        assert_eq!(Operation::Delete.method(), Method::Delete);
    }

    #[test]
    fn test_method_strings() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert_eq!(Method::from_str("PUT").unwrap(), Method::Put);
        assert_eq!(Operation::Update.to_string(), "update");
    }

    #[test]
    fn test_filter_query() {
        let q = filter_query(&[
            ("organization".into(), "acme".into()),
            ("workspace".into(), "prod".into()),
        ]);
        assert_eq!(q, "?filter[organization][name]=acme&filter[workspace][name]=prod");
        assert_eq!(filter_query(&[]), "");
    }

    #[test]
    fn test_prefix_table() {
        let table = PrefixTable::new(1, "/api/v1/namespaces")
            .with_rule("deployments", "/apis/apps/v1/namespaces");

        let p = VirtualPath::new("/default/deployments/web");
        assert_eq!(table.prefix_for(&p), "/apis/apps/v1/namespaces");
        assert_eq!(table.kind_of(&p), Some("deployments"));

        let p = VirtualPath::new("/default/pods/web");
        assert_eq!(table.prefix_for(&p), "/api/v1/namespaces");

        // Too shallow to carry a kind.
        assert_eq!(table.prefix_for(&VirtualPath::root()), "/api/v1/namespaces");

        let d = table.describe("/api/v1/namespaces", &VirtualPath::root());
        assert_eq!(d.url, "/api/v1/namespaces");
        assert_eq!(d.kind, None);
    }

    static RULES: &[ShapeRule] = &[
        ShapeRule {
            ops: &[Operation::Read],
            shape: &[Seg::Lit("orgs"), Seg::Any("organization"), Seg::Lit("vars")],
            target: Target::Filtered {
                collection: Part::Lit("vars"),
                filters: &["organization"],
            },
        },
        ShapeRule {
            ops: &[Operation::Read],
            shape: &[
                Seg::Lit("orgs"),
                Seg::Any("organization"),
                Seg::OneOf("kind", &["keys", "policies"]),
                Seg::Any("id"),
            ],
            target: Target::Instance {
                kind: Part::Cap("kind"),
                id: Part::Cap("id"),
            },
        },
    ];

    #[test]
    fn test_shape_table_filtered() {
        let table = ShapeTable::new("/api", RULES);
        let d = table.describe(&VirtualPath::new("/orgs/acme/vars"), Operation::Read);
        assert_eq!(d.url, "/api/vars?filter[organization][name]=acme");
        assert_eq!(d.qualifier("organization"), Some("acme"));
        assert_eq!(d.kind.as_deref(), Some("vars"));
    }

    #[test]
    fn test_shape_table_instance() {
        let table = ShapeTable::new("/api", RULES);
        let d = table.describe(&VirtualPath::new("/orgs/acme/keys/k-1"), Operation::Read);
        assert_eq!(d.url, "/api/keys/k-1");

        // OneOf rejects other kinds; falls through to passthrough.
        let d = table.describe(&VirtualPath::new("/orgs/acme/teams/t-1"), Operation::Read);
        assert_eq!(d.url, "/api/orgs/acme/teams/t-1");
    }

    #[test]
    fn test_shape_table_respects_operation() {
        let table = ShapeTable::new("/api", RULES);
        let d = table.describe(&VirtualPath::new("/orgs/acme/vars"), Operation::Delete);
        assert_eq!(d.url, "/api/orgs/acme/vars");
        assert!(d.qualifiers.is_empty());
    }
}
