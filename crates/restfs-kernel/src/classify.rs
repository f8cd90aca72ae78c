//! Directory-vs-file classification.
//!
//! Remote hierarchies carry no schema the kernel can consult cheaply, so
//! the type of a node is decided from its path string alone: anything at or
//! above a per-bridge depth ceiling is a collection, anything deeper is a
//! resource, and a handful of anchored patterns force known blob-like
//! collections (variable sets, policies, keys) to be files regardless of
//! depth. Attribute queries therefore never hit the network.

use regex::RegexSet;

use crate::vfs::{FileType, VirtualPath};

/// Pure path classifier.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    max_dir_depth: usize,
    file_patterns: RegexSet,
}

impl PathClassifier {
    /// Create a classifier.
    ///
    /// Paths with `depth <= max_dir_depth` are directories unless one of
    /// `file_patterns` matches the whole path.
    pub fn new<I, S>(max_dir_depth: usize, file_patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let anchored: Vec<String> = file_patterns
            .into_iter()
            .map(|p| format!("^(?:{})$", p.as_ref()))
            .collect();
        Ok(Self {
            max_dir_depth,
            file_patterns: RegexSet::new(anchored)?,
        })
    }

    /// Classifier with no exception patterns.
    pub fn depth_only(max_dir_depth: usize) -> Self {
        Self {
            max_dir_depth,
            file_patterns: RegexSet::empty(),
        }
    }

    /// The deepest depth still treated as a directory.
    pub fn max_dir_depth(&self) -> usize {
        self.max_dir_depth
    }

    /// Returns true if an exception pattern forces `path` to be a file.
    pub fn is_forced_file(&self, path: &VirtualPath) -> bool {
        self.file_patterns.is_match(path.as_str())
    }

    /// Classify `path`.
    pub fn classify(&self, path: &VirtualPath) -> FileType {
        if path.is_root() {
            return FileType::Directory;
        }
        if self.is_forced_file(path) {
            return FileType::File;
        }
        if path.depth() <= self.max_dir_depth {
            FileType::Directory
        } else {
            FileType::File
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(c: &PathClassifier, p: &str) -> FileType {
        c.classify(&VirtualPath::new(p))
    }

    #[test]
    fn test_depth_ceiling_is_inclusive() {
        let c = PathClassifier::depth_only(2);
        assert_eq!(classify(&c, "/"), FileType::Directory);
        assert_eq!(classify(&c, "/default"), FileType::Directory);
        assert_eq!(classify(&c, "/default/pods"), FileType::Directory);
        assert_eq!(classify(&c, "/default/pods/nginx"), FileType::File);
        assert_eq!(classify(&c, "/default/pods/nginx/extra"), FileType::File);
    }

    #[test]
    fn test_exception_overrides_depth() {
        let c = PathClassifier::new(5, ["/organizations/(.*)/policies/(.*)"]).unwrap();
        // depth 4 would be a directory by depth alone
        assert_eq!(classify(&c, "/organizations/acme/policies/pol-1"), FileType::File);
        assert_eq!(classify(&c, "/organizations/acme/workspaces/prod"), FileType::Directory);
    }

    #[test]
    fn test_patterns_are_anchored() {
        let c = PathClassifier::new(5, ["/organizations/(.*)/policies/(.*)"]).unwrap();
        assert_eq!(classify(&c, "/x/organizations/acme/policies/p"), FileType::Directory);
        assert_eq!(classify(&c, "/organizations/acme/policies"), FileType::Directory);
    }

    #[test]
    fn test_deterministic() {
        let c = PathClassifier::new(5, ["/organizations/(.*)/ssh-keys/(.*)"]).unwrap();
        let p = VirtualPath::new("/organizations/acme/ssh-keys/key-1");
        let first = c.classify(&p);
        for _ in 0..10 {
            assert_eq!(c.classify(&p), first);
        }
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        assert!(PathClassifier::new(2, ["(unclosed"]).is_err());
    }
}
