//! Read-only FUSE projection of a repository
//!
//! Presents every snapshot as a top-level directory named by its id,
//! with manifest directories and blob files below it. Records and
//! manifests are re-read on each directory operation; the repository
//! is immutable while mounted and the files are small.
//!
//! Inode identity: a mount-scoped table maps each snapshot id or
//! object hash to an inode number the first time it is seen and
//! returns the same number forever after. The table is insert-only
//! and guarded by one mutex; the kernel may invoke callbacks from
//! arbitrary worker threads.

use crate::error::{HbackError, Result};
use crate::index;
use crate::repo::Repository;
use crate::types::{ContentHash, DirManifest, Snapshot};
use fuser::{
    BackgroundSession, FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, Request, FUSE_ROOT_ID,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Kernel cache lifetime for entries and attributes. Objects are
/// immutable, so a short TTL only costs re-lookups, never staleness.
const TTL: Duration = Duration::from_secs(1);

/// What a virtual inode stands for.
///
/// Three behavioral modes: the mount root (listing snapshot records),
/// a snapshot root (reading from `backups/`), and manifest-or-blob
/// nodes (reading from `hashes/`).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Root,
    Snapshot { id: String },
    Dir { hash: ContentHash },
    File { hash: ContentHash },
}

impl Node {
    /// The inode-table key: snapshot id or object hash.
    fn key(&self) -> String {
        match self {
            Node::Root => String::new(),
            Node::Snapshot { id } => id.clone(),
            Node::Dir { hash } | Node::File { hash } => hash.to_string(),
        }
    }

    fn file_type(&self) -> FileType {
        match self {
            Node::File { .. } => FileType::RegularFile,
            _ => FileType::Directory,
        }
    }
}

/// One child produced by listing a directory node.
struct ChildRef {
    name: String,
    node: Node,
}

/// Insert-only map from identifier-or-hash to inode number.
struct InodeTable {
    by_key: HashMap<String, u64>,
    nodes: HashMap<u64, Node>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(FUSE_ROOT_ID, Node::Root);
        Self {
            by_key: HashMap::new(),
            nodes,
            // 0 is reserved by the kernel and FUSE_ROOT_ID is the root
            next: FUSE_ROOT_ID + 1,
        }
    }

    /// Inode for the node's key, assigned on first sight.
    fn assign(&mut self, node: &Node) -> u64 {
        if let Node::Root = node {
            return FUSE_ROOT_ID;
        }
        let key = node.key();
        if let Some(&ino) = self.by_key.get(&key) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_key.insert(key, ino);
        self.nodes.insert(ino, node.clone());
        ino
    }

    fn node(&self, ino: u64) -> Option<Node> {
        self.nodes.get(&ino).cloned()
    }
}

/// Open blob handles, keyed by file handle number.
struct HandleTable {
    files: HashMap<u64, fs::File>,
    next: u64,
}

/// The FUSE filesystem over one repository.
pub struct BackupFs {
    repo: Repository,
    inodes: Mutex<InodeTable>,
    handles: Mutex<HandleTable>,
}

impl BackupFs {
    #[must_use]
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            inodes: Mutex::new(InodeTable::new()),
            handles: Mutex::new(HandleTable {
                files: HashMap::new(),
                next: 1,
            }),
        }
    }

    /// List the children of a directory node.
    fn children_of(&self, node: &Node) -> Result<Vec<ChildRef>> {
        match node {
            Node::Root => {
                let snapshots = index::list_snapshots(&self.repo)?;
                Ok(snapshots
                    .into_iter()
                    .map(|s| ChildRef {
                        name: s.id.clone(),
                        node: Node::Snapshot { id: s.id },
                    })
                    .collect())
            }
            Node::Snapshot { id } => {
                let snapshot: Snapshot = self.repo.read_json(&self.repo.snapshot_path(id))?;
                Ok(Self::manifest_children(&snapshot.content))
            }
            Node::Dir { hash } => {
                let manifest: DirManifest =
                    self.repo.read_json(&self.repo.object_path(hash))?;
                Ok(Self::manifest_children(&manifest))
            }
            Node::File { .. } => Err(HbackError::Mount("not a directory".to_string())),
        }
    }

    fn manifest_children(manifest: &DirManifest) -> Vec<ChildRef> {
        manifest
            .children
            .iter()
            .map(|child| ChildRef {
                name: child.name.clone(),
                node: if child.is_dir {
                    Node::Dir { hash: child.hash }
                } else {
                    Node::File { hash: child.hash }
                },
            })
            .collect()
    }

    /// Attributes for a node. Blob files are stat'ed for size and
    /// mtime; directories are synthetic.
    fn attr_of(&self, ino: u64, node: &Node, uid: u32, gid: u32) -> Result<FileAttr> {
        let (size, mtime, kind, perm, nlink) = match node {
            Node::File { hash } => {
                let meta = fs::metadata(self.repo.object_path(hash))?;
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                (meta.len(), mtime, FileType::RegularFile, 0o444, 1)
            }
            _ => (0, SystemTime::UNIX_EPOCH, FileType::Directory, 0o555, 2),
        };

        Ok(FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind,
            perm,
            nlink,
            uid,
            gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        })
    }

    fn node_for(&self, ino: u64) -> Option<Node> {
        lock(&self.inodes).node(ino)
    }

    fn assign_ino(&self, node: &Node) -> u64 {
        lock(&self.inodes).assign(node)
    }
}

/// Mutations under these locks are single inserts or removes; a
/// poisoned lock is recovered rather than propagated.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Whether open flags carry write intent.
fn wants_write(flags: i32) -> bool {
    (flags & libc::O_ACCMODE) != libc::O_RDONLY
        || flags & (libc::O_APPEND | libc::O_CREAT | libc::O_TRUNC) != 0
}

impl Filesystem for BackupFs {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_node) = self.node_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let children = match self.children_of(&parent_node) {
            Ok(children) => children,
            Err(e) => {
                debug!("lookup under {:?} failed: {}", parent_node, e);
                reply.error(libc::ENOENT);
                return;
            }
        };

        let name = name.to_string_lossy();
        for child in children {
            if child.name == name {
                let ino = self.assign_ino(&child.node);
                match self.attr_of(ino, &child.node, req.uid(), req.gid()) {
                    Ok(attr) => reply.entry(&TTL, &attr, 0),
                    Err(_) => reply.error(libc::ENOENT),
                }
                return;
            }
        }
        reply.error(libc::ENOENT);
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(node) = self.node_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.attr_of(ino, &node, req.uid(), req.gid()) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(_) => reply.error(libc::ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(node) = self.node_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Node::File { .. } = node {
            reply.error(libc::ENOTDIR);
            return;
        }
        let children = match self.children_of(&node) {
            Ok(children) => children,
            Err(e) => {
                debug!("readdir of {:?} failed: {}", node, e);
                reply.error(libc::ENOENT);
                return;
            }
        };

        // `..` of a deduplicated manifest is ambiguous (the DAG allows
        // many parents); report the mount root and let the kernel's
        // path cache resolve real parentage.
        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (FUSE_ROOT_ID, FileType::Directory, "..".to_string()),
        ];
        for child in children {
            let child_ino = self.assign_ino(&child.node);
            entries.push((child_ino, child.node.file_type(), child.name));
        }

        for (i, (child_ino, kind, name)) in
            entries.into_iter().enumerate().skip(offset as usize)
        {
            if reply.add(child_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if wants_write(flags) {
            reply.error(libc::ENOTSUP);
            return;
        }
        let Some(node) = self.node_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Node::File { hash } = node else {
            reply.error(libc::EISDIR);
            return;
        };

        match fs::File::open(self.repo.object_path(&hash)) {
            Ok(file) => {
                let mut handles = lock(&self.handles);
                let fh = handles.next;
                handles.next += 1;
                handles.files.insert(fh, file);
                reply.opened(fh, 0);
            }
            Err(e) => {
                debug!("open of blob {} failed: {}", hash, e);
                reply.error(libc::ENOENT);
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let handles = lock(&self.handles);
        let Some(file) = handles.files.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let mut buf = vec![0u8; size as usize];
        let mut filled = 0;
        loop {
            match file.read_at(&mut buf[filled..], offset as u64 + filled as u64) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    if filled == buf.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => {
                    reply.error(libc::EIO);
                    return;
                }
            }
        }
        reply.data(&buf[..filled]);
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        lock(&self.handles).files.remove(&fh);
        reply.ok();
    }
}

/// A live mount; dropping it unmounts.
pub struct MountGuard {
    _session: BackgroundSession,
}

/// Mount the repository read-only at `mountpoint`.
///
/// The mountpoint directory is created if missing. Returns a guard
/// whose drop unmounts; callers decide how long the mount lives
/// (the CLI blocks until SIGINT/SIGTERM).
pub fn spawn(repo: Repository, mountpoint: &Path) -> Result<MountGuard> {
    if let Err(e) = fs::create_dir(mountpoint) {
        if e.kind() != std::io::ErrorKind::AlreadyExists {
            return Err(HbackError::Mount(format!(
                "could not create mount point {}: {e}",
                mountpoint.display()
            )));
        }
    }

    let options = [MountOption::RO, MountOption::FSName("hback".to_string())];
    let session = fuser::spawn_mount2(BackupFs::new(repo), mountpoint, &options)
        .map_err(|e| HbackError::Mount(e.to_string()))?;

    debug!("Mounted repository at {}", mountpoint.display());
    Ok(MountGuard { _session: session })
}
