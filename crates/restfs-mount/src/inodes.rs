//! Inode ↔ path mapping.
//!
//! The kernel speaks inodes; the backend speaks paths. An inode is handed
//! out when the kernel first looks a path up and is dropped again once the
//! kernel forgets every lookup of it. The root is pinned.

use parking_lot::RwLock;
use std::collections::HashMap;

use restfs_kernel::VirtualPath;

/// Inode of the mount root.
pub const ROOT_INODE: u64 = 1;

#[derive(Debug)]
struct Node {
    path: VirtualPath,
    lookups: u64,
}

#[derive(Debug)]
struct Inner {
    nodes: HashMap<u64, Node>,
    inodes: HashMap<VirtualPath, u64>,
    next: u64,
}

/// Bidirectional, lookup-counted inode table.
#[derive(Debug)]
pub struct InodeTable {
    inner: RwLock<Inner>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = VirtualPath::root();
        let mut nodes = HashMap::new();
        let mut inodes = HashMap::new();
        nodes.insert(
            ROOT_INODE,
            Node {
                path: root.clone(),
                lookups: 0,
            },
        );
        inodes.insert(root, ROOT_INODE);
        Self {
            inner: RwLock::new(Inner {
                nodes,
                inodes,
                next: ROOT_INODE + 1,
            }),
        }
    }

    /// Path for `ino`, if it is still mapped.
    pub fn path(&self, ino: u64) -> Option<VirtualPath> {
        self.inner.read().nodes.get(&ino).map(|n| n.path.clone())
    }

    /// Path of `name` inside directory `parent`.
    pub fn child_path(&self, parent: u64, name: &str) -> Option<VirtualPath> {
        self.path(parent).map(|p| p.join(name))
    }

    /// Inode for `path` if one is mapped. Never allocates.
    pub fn peek(&self, path: &VirtualPath) -> Option<u64> {
        self.inner.read().inodes.get(path).copied()
    }

    /// Inode for `path`, allocating on first sight, counting one kernel
    /// lookup. Every entry reply (lookup, create, mkdir) goes through here.
    pub fn lookup(&self, path: &VirtualPath) -> u64 {
        let mut inner = self.inner.write();
        let existing = inner.inodes.get(path).copied();
        if let Some(ino) = existing {
            if let Some(node) = inner.nodes.get_mut(&ino) {
                node.lookups += 1;
            }
            return ino;
        }
        let ino = inner.next;
        inner.next += 1;
        inner.nodes.insert(
            ino,
            Node {
                path: path.clone(),
                lookups: 1,
            },
        );
        inner.inodes.insert(path.clone(), ino);
        ino
    }

    /// Drop `nlookup` kernel references to `ino`, unmapping it at zero.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INODE {
            return;
        }
        let mut inner = self.inner.write();
        let Some(node) = inner.nodes.get_mut(&ino) else {
            return;
        };
        node.lookups = node.lookups.saturating_sub(nlookup);
        if node.lookups == 0 {
            if let Some(node) = inner.nodes.remove(&ino) {
                // The path may already point at a newer inode after unlink.
                if inner.inodes.get(&node.path) == Some(&ino) {
                    inner.inodes.remove(&node.path);
                }
            }
        }
    }

    /// Detach `path` from its inode so a later lookup allocates a fresh one.
    /// The old inode stays resolvable until the kernel forgets it. The root
    /// is never detached.
    pub fn remove(&self, path: &VirtualPath) {
        if path.is_root() {
            return;
        }
        self.inner.write().inodes.remove(path);
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
