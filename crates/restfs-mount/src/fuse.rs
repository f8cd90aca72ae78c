//! FUSE adapter.
//!
//! Translates inode-based kernel callbacks into path-based [`VfsOps`]
//! calls. Callbacks arrive on the FUSE session thread and block on the
//! tokio runtime for the duration of each backend call.
//!
//! Every open is direct I/O: file sizes are reported as zero, so the page
//! cache must never serve a read.
//!
//! A directory listing is fetched when the kernel reads a directory handle
//! from offset zero; later offsets page through that snapshot.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr as FuseAttr, FileType as FuseType, Filesystem, MountOption, ReplyAttr, ReplyCreate,
    ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite,
    Request, TimeOrNow,
};
use tokio::runtime::Handle;

use restfs_kernel::{FileAttr, FileHandle, FileType, SetAttr, VfsError, VfsOps, VirtualPath};

use crate::inodes::{InodeTable, ROOT_INODE};

/// Attribute and entry cache lifetime.
const TTL: Duration = Duration::from_secs(1);

const BLOCK_SIZE: u32 = 512;

/// `d_ino` for listed names the kernel has not looked up yet.
const UNKNOWN_INO: u64 = 0xffff_ffff;

/// One directory entry as handed to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listed {
    ino: u64,
    kind: FuseType,
    name: String,
}

impl Listed {
    fn new(ino: u64, kind: FuseType, name: impl Into<String>) -> Self {
        Self {
            ino,
            kind,
            name: name.into(),
        }
    }
}

/// Map a backend error to an errno.
pub fn errno(e: &VfsError) -> i32 {
    match e {
        VfsError::NotFound(_) => libc::ENOENT,
        VfsError::InvalidArgument(_) => libc::EINVAL,
        VfsError::NotADirectory(_) => libc::ENOTDIR,
        VfsError::IsADirectory(_) => libc::EISDIR,
        VfsError::Transport(_) | VfsError::Other(_) => libc::EIO,
        VfsError::Io(io) => io.raw_os_error().unwrap_or(libc::EIO),
    }
}

fn fuse_kind(kind: FileType) -> FuseType {
    match kind {
        FileType::File => FuseType::RegularFile,
        FileType::Directory => FuseType::Directory,
    }
}

/// Mount options shared by every bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountFlags {
    pub allow_other: bool,
    pub auto_unmount: bool,
}

impl MountFlags {
    fn options(self, fs_name: &str) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(fs_name.to_string()),
            MountOption::Subtype("restfs".to_string()),
            MountOption::RW,
            MountOption::NoAtime,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// FUSE filesystem over a [`VfsOps`] backend.
pub struct RestFuse {
    backend: Arc<dyn VfsOps>,
    runtime: Handle,
    inodes: InodeTable,
    /// Directory snapshots by directory handle.
    listings: HashMap<u64, Vec<Listed>>,
    next_dir_handle: u64,
    uid: u32,
    gid: u32,
}

impl RestFuse {
    /// Wrap `backend`; calls are driven on `runtime`.
    pub fn new(backend: Arc<dyn VfsOps>, runtime: Handle) -> Self {
        Self {
            backend,
            runtime,
            inodes: InodeTable::new(),
            listings: HashMap::new(),
            next_dir_handle: 1,
            // SAFETY: getuid/getgid cannot fail.
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Mount at `mountpoint` and serve until unmounted.
    pub fn mount(self, mountpoint: &Path, fs_name: &str, flags: MountFlags) -> std::io::Result<()> {
        tracing::info!(mountpoint = %mountpoint.display(), fs_name, "mounting");
        fuser::mount2(self, mountpoint, &flags.options(fs_name))
    }

    fn to_fuse_attr(&self, ino: u64, attr: &FileAttr) -> FuseAttr {
        FuseAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: UNIX_EPOCH,
            kind: fuse_kind(attr.kind),
            perm: attr.perm as u16,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn path_of(&self, ino: u64) -> Result<VirtualPath, i32> {
        self.inodes.path(ino).ok_or(libc::ENOENT)
    }

    fn child_of(&self, parent: u64, name: &OsStr) -> Result<VirtualPath, i32> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        self.inodes.child_path(parent, name).ok_or(libc::ENOENT)
    }

    /// Run a backend call to completion, logging failures.
    fn run<T>(
        &self,
        op: &'static str,
        path: &VirtualPath,
        fut: impl std::future::Future<Output = Result<T, VfsError>>,
    ) -> Result<T, i32> {
        self.runtime.block_on(fut).map_err(|e| {
            tracing::warn!(op, path = %path, error = %e, "operation failed");
            errno(&e)
        })
    }

    fn open_dir(&mut self) -> u64 {
        let fh = self.next_dir_handle;
        self.next_dir_handle += 1;
        fh
    }

    /// Fetch the full listing of `ino`, including "." and "..".
    fn snapshot(&self, ino: u64) -> Result<Vec<Listed>, i32> {
        let path = self.path_of(ino)?;
        let children = self.run("readdir", &path, self.backend.readdir(&path))?;

        let parent_ino = if path.is_root() {
            ROOT_INODE
        } else {
            self.inodes.peek(&path.parent()).unwrap_or(UNKNOWN_INO)
        };

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(Listed::new(ino, FuseType::Directory, "."));
        entries.push(Listed::new(parent_ino, FuseType::Directory, ".."));
        for child in children {
            let child_ino = self
                .inodes
                .peek(&path.join(&child.name))
                .unwrap_or(UNKNOWN_INO);
            entries.push(Listed::new(child_ino, fuse_kind(child.kind), child.name));
        }
        Ok(entries)
    }

    /// Entries of handle `fh` from `offset` on, each paired with the offset
    /// of the entry after it. The remote listing is fetched at offset zero;
    /// continuations are served from that snapshot.
    fn listing_page(
        &mut self,
        ino: u64,
        fh: u64,
        offset: i64,
    ) -> Result<Vec<(i64, Listed)>, i32> {
        let skip = usize::try_from(offset).unwrap_or(0);
        if skip == 0 || !self.listings.contains_key(&fh) {
            let entries = self.snapshot(ino)?;
            self.listings.insert(fh, entries);
        } else {
            tracing::trace!(ino, fh, offset, "readdir continuation");
        }
        Ok(self
            .listings
            .get(&fh)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .skip(skip)
                    .map(|(i, e)| ((i + 1) as i64, e.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn entry(&self, path: &VirtualPath, attr: &FileAttr, reply: ReplyEntry) {
        let ino = self.inodes.lookup(path);
        reply.entry(&TTL, &self.to_fuse_attr(ino, attr), 0);
    }
}

impl Filesystem for RestFuse {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child_of(parent, name) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("lookup", &path, self.backend.getattr(&path)) {
            Ok(attr) => self.entry(&path, &attr, reply),
            Err(code) => reply.error(code),
        }
    }

    fn forget(&mut self, _req: &Request, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("getattr", &path, self.backend.getattr(&path)) {
            Ok(attr) => reply.attr(&TTL, &self.to_fuse_attr(ino, &attr)),
            Err(code) => reply.error(code),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };

        if let Some(size) = size {
            if let Err(code) = self.run("truncate", &path, self.backend.truncate(&path, size)) {
                return reply.error(code);
            }
        }

        let changes = SetAttr {
            size,
            perm: mode,
            mtime: mtime.map(|t| match t {
                TimeOrNow::SpecificTime(t) => t,
                TimeOrNow::Now => SystemTime::now(),
            }),
        };
        match self.run("setattr", &path, self.backend.setattr(&path, changes)) {
            Ok(attr) => reply.attr(&TTL, &self.to_fuse_attr(ino, &attr)),
            Err(code) => reply.error(code),
        }
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.path_of(ino) {
            Ok(_) => reply.opened(self.open_dir(), 0),
            Err(code) => reply.error(code),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let page = match self.listing_page(ino, fh, offset) {
            Ok(page) => page,
            Err(code) => return reply.error(code),
        };
        for (next, entry) in page {
            if reply.add(entry.ino, next, entry.kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        self.listings.remove(&fh);
        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("open", &path, self.backend.open(&path)) {
            Ok(fh) => reply.opened(fh.raw(), fuser::consts::FOPEN_DIRECT_IO),
            Err(code) => reply.error(code),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        let handle = FileHandle(fh);
        match self.run("read", &path, self.backend.read(handle, &path, offset, size)) {
            Ok(data) => reply.data(&data),
            Err(code) => reply.error(code),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.run("write", &path, self.backend.write(&path, offset, data)) {
            Ok(written) => reply.written(written),
            Err(code) => reply.error(code),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let path = self.inodes.path(ino).unwrap_or_else(VirtualPath::root);
        match self.run("release", &path, self.backend.release(FileHandle(fh))) {
            Ok(()) => reply.ok(),
            Err(code) => reply.error(code),
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_of(parent, name) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("create", &path, self.backend.create(&path, mode)) {
            Ok((attr, fh)) => {
                let ino = self.inodes.lookup(&path);
                reply.created(
                    &TTL,
                    &self.to_fuse_attr(ino, &attr),
                    0,
                    fh.raw(),
                    fuser::consts::FOPEN_DIRECT_IO,
                );
            }
            Err(code) => reply.error(code),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_of(parent, name) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("mkdir", &path, self.backend.mkdir(&path, mode)) {
            Ok(attr) => self.entry(&path, &attr, reply),
            Err(code) => reply.error(code),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_of(parent, name) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("unlink", &path, self.backend.unlink(&path)) {
            Ok(()) => {
                self.inodes.remove(&path);
                reply.ok();
            }
            Err(code) => reply.error(code),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_of(parent, name) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        match self.run("rmdir", &path, self.backend.rmdir(&path)) {
            Ok(()) => {
                self.inodes.remove(&path);
                reply.ok();
            }
            Err(code) => reply.error(code),
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        match self.run("statfs", &VirtualPath::root(), self.backend.statfs()) {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            ),
            Err(code) => reply.error(code),
        }
    }
}
