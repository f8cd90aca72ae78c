//! Virtual paths.
//!
//! A [`VirtualPath`] is the slash-delimited name of a node in the synthetic
//! tree. Its depth (separator count) is the only signal the classifier and
//! the listing rules get, so the string is kept exactly as given apart from
//! forcing a leading `/`. In particular a trailing `/` survives: directory
//! creation relies on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Immutable slash-delimited path in the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The root path.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Create a path, prefixing `/` if missing.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        if path.starts_with(SEPARATOR) {
            Self(path.to_string())
        } else {
            Self(format!("/{path}"))
        }
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for `/`.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Separator count; the root is depth 0.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches(SEPARATOR).count()
        }
    }

    /// Non-empty segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// The `n`th segment (0-based), if present.
    pub fn segment(&self, n: usize) -> Option<&str> {
        self.segments().nth(n)
    }

    /// The final segment; empty for the root or a trailing separator.
    pub fn basename(&self) -> &str {
        match self.0.rfind(SEPARATOR) {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The path truncated at its last separator.
    ///
    /// `/a/b` becomes `/a`, `/a` becomes `/`, and `/a/b/` becomes `/a/b`.
    pub fn parent(&self) -> VirtualPath {
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Self::root(),
            Some(idx) => Self(self.0[..idx].to_string()),
        }
    }

    /// Append a child name.
    pub fn join(&self, name: &str) -> VirtualPath {
        if self.0.ends_with(SEPARATOR) {
            Self(format!("{}{}", self.0, name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// This path with a trailing separator appended.
    pub fn with_trailing_separator(&self) -> VirtualPath {
        if self.0.ends_with(SEPARATOR) {
            self.clone()
        } else {
            Self(format!("{}/", self.0))
        }
    }

    /// The path as it appears appended to a URL prefix (the root contributes nothing).
    pub fn url_suffix(&self) -> &str {
        if self.is_root() { "" } else { &self.0 }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VirtualPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for VirtualPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(VirtualPath::root().depth(), 0);
        assert_eq!(VirtualPath::new("/default").depth(), 1);
        assert_eq!(VirtualPath::new("/default/pods").depth(), 2);
        assert_eq!(VirtualPath::new("/default/pods/nginx").depth(), 3);
        assert_eq!(VirtualPath::new("/default/pods/").depth(), 3);
    }

    #[test]
    fn test_leading_separator_added() {
        assert_eq!(VirtualPath::new("organizations").as_str(), "/organizations");
        assert_eq!(VirtualPath::new("").as_str(), "/");
        assert!(VirtualPath::new("").is_root());
    }

    #[test]
    fn test_segments() {
        let p = VirtualPath::new("/organizations/acme/workspaces/prod");
        let segs: Vec<_> = p.segments().collect();
        assert_eq!(segs, vec!["organizations", "acme", "workspaces", "prod"]);
        assert_eq!(p.segment(1), Some("acme"));
        assert_eq!(p.segment(9), None);
        assert_eq!(p.basename(), "prod");
    }

    #[test]
    fn test_parent() {
        assert_eq!(VirtualPath::new("/a/b/c").parent().as_str(), "/a/b");
        assert_eq!(VirtualPath::new("/a").parent().as_str(), "/");
        assert_eq!(VirtualPath::root().parent().as_str(), "/");
        // A trailing separator means the last segment is empty.
        assert_eq!(VirtualPath::new("/ns/").parent().as_str(), "/ns");
    }

    #[test]
    fn test_join_and_trailing() {
        assert_eq!(VirtualPath::root().join("default").as_str(), "/default");
        assert_eq!(VirtualPath::new("/default").join("pods").as_str(), "/default/pods");
        assert_eq!(
            VirtualPath::new("/default").with_trailing_separator().as_str(),
            "/default/"
        );
        assert_eq!(
            VirtualPath::new("/default/").with_trailing_separator().as_str(),
            "/default/"
        );
    }

    #[test]
    fn test_url_suffix() {
        assert_eq!(VirtualPath::root().url_suffix(), "");
        assert_eq!(VirtualPath::new("/default/pods").url_suffix(), "/default/pods");
    }
}
