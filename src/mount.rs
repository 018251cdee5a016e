//! FUSE adapter exposing a volume as a flat, read-only directory.
//!
//! The adapter only talks to the [`Filesystem`] capability trait; nothing in
//! the decoder knows about FUSE types.

use std::path::Path;
#[cfg(feature = "fuse")]
use std::collections::HashMap;
#[cfg(feature = "fuse")]
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::config::MountConfig;
use crate::fs::entry::FileEntry;
use crate::fs::filesystem::Filesystem;

pub const ROOT_INODE: u64 = 1;
#[cfg(feature = "fuse")]
const TTL: Duration = Duration::from_secs(1);
#[cfg(feature = "fuse")]
const FILE_PERM: u16 = 0o444;
#[cfg(feature = "fuse")]
const DIR_PERM: u16 = 0o755;

/// Fixed inode numbering: the root is 1, files are 2.. in listing order.
#[derive(Debug, Clone)]
pub struct InodeTable {
    names: Vec<String>,
}

impl InodeTable {
    pub fn new(entries: &[FileEntry]) -> Self {
        Self {
            names: entries.iter().map(|e| e.name.clone()).collect(),
        }
    }

    pub fn inode_for(&self, name: &str) -> Option<u64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u64 + ROOT_INODE + 1)
    }

    pub fn name_for(&self, inode: u64) -> Option<&str> {
        let index = inode.checked_sub(ROOT_INODE + 1)?;
        self.names.get(index as usize).map(String::as_str)
    }

    /// `(inode, name)` pairs in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u64 + ROOT_INODE + 1, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// True when open flags ask for anything beyond reading.
pub fn is_write_intent(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY || flags & (libc::O_TRUNC | libc::O_APPEND) != 0
}

/// Mount `fs` read-only at `at` and serve requests until unmounted.
///
/// The mount point is created if it does not exist.
pub fn mount(
    fs: Box<dyn Filesystem>,
    image: &Path,
    at: &Path,
    config: &MountConfig,
) -> Result<()> {
    std::fs::create_dir_all(at)
        .with_context(|| format!("create mount directory {}", at.display()))?;

    #[cfg(feature = "fuse")]
    {
        let filesystem = Dos33Fuse::new(fs, ImageTimes::of(image));
        let mut options = vec![
            fuser::MountOption::RO,
            fuser::MountOption::FSName(config.fs_name.clone()),
            fuser::MountOption::Subtype("dos33".to_owned()),
        ];
        if config.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }
        if config.auto_unmount {
            options.push(fuser::MountOption::AutoUnmount);
        }
        log::info!("mounting {} at {}", image.display(), at.display());
        fuser::mount2(filesystem, at, &options)
            .with_context(|| format!("mount {}", at.display()))?;
        log::info!("unmounted {}", at.display());
        Ok(())
    }
    #[cfg(not(feature = "fuse"))]
    {
        let _ = fs;
        let _ = image;
        let _ = config;
        Err(anyhow::anyhow!(
            "fuse support disabled; rebuild a2fs with --features fuse"
        ))
    }
}

/// Timestamps reported for every node, taken from the image file.
#[cfg(feature = "fuse")]
#[derive(Debug, Clone, Copy)]
struct ImageTimes {
    atime: SystemTime,
    mtime: SystemTime,
    crtime: SystemTime,
}

#[cfg(feature = "fuse")]
impl ImageTimes {
    fn of(image: &Path) -> Self {
        let now = SystemTime::now();
        match std::fs::metadata(image) {
            Ok(meta) => {
                let mtime = meta.modified().unwrap_or(now);
                Self {
                    atime: meta.accessed().unwrap_or(mtime),
                    mtime,
                    crtime: meta.created().unwrap_or(mtime),
                }
            }
            Err(e) => {
                log::warn!("cannot stat {}: {e}", image.display());
                Self {
                    atime: now,
                    mtime: now,
                    crtime: now,
                }
            }
        }
    }
}

#[cfg(feature = "fuse")]
struct Dos33Fuse {
    fs: Box<dyn Filesystem>,
    inodes: InodeTable,
    times: ImageTimes,
    uid: u32,
    gid: u32,
    handles: HashMap<u64, String>,
    next_handle: u64,
}

#[cfg(feature = "fuse")]
impl Dos33Fuse {
    fn new(fs: Box<dyn Filesystem>, times: ImageTimes) -> Self {
        let inodes = InodeTable::new(&fs.list_entries());
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            fs,
            inodes,
            times,
            uid,
            gid,
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    fn attr(&self, inode: u64, size: u64, is_dir: bool) -> fuser::FileAttr {
        fuser::FileAttr {
            ino: inode,
            size,
            blocks: size.div_ceil(512),
            atime: self.times.atime,
            mtime: self.times.mtime,
            ctime: self.times.mtime,
            crtime: self.times.crtime,
            kind: if is_dir {
                fuser::FileType::Directory
            } else {
                fuser::FileType::RegularFile
            },
            perm: if is_dir { DIR_PERM } else { FILE_PERM },
            nlink: if is_dir { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            flags: 0,
            blksize: self.fs.block_size(),
        }
    }

    fn file_attr(&self, inode: u64) -> Result<fuser::FileAttr, i32> {
        let name = self.inodes.name_for(inode).ok_or(libc::ENOENT)?;
        let attrs = self.fs.attributes(name).map_err(|e| e.errno())?;
        Ok(self.attr(inode, attrs.size, false))
    }
}

#[cfg(feature = "fuse")]
impl fuser::Filesystem for Dos33Fuse {
    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEntry,
    ) {
        if parent != ROOT_INODE {
            reply.error(libc::ENOENT);
            return;
        }
        let Some(inode) = name.to_str().and_then(|n| self.inodes.inode_for(n)) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.file_attr(inode) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        inode: u64,
        _fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        if inode == ROOT_INODE {
            reply.attr(&TTL, &self.attr(ROOT_INODE, 0, true));
            return;
        }
        match self.file_attr(inode) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        inode: u64,
        _fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        if inode != ROOT_INODE {
            reply.error(libc::ENOTDIR);
            return;
        }
        let mut listing = Vec::with_capacity(self.inodes.len() + 2);
        listing.push((ROOT_INODE, fuser::FileType::Directory, "."));
        listing.push((ROOT_INODE, fuser::FileType::Directory, ".."));
        listing.extend(
            self.inodes
                .iter()
                .map(|(ino, name)| (ino, fuser::FileType::RegularFile, name)),
        );

        let start = offset.max(0) as usize;
        for (idx, (ino, kind, name)) in listing.into_iter().enumerate().skip(start) {
            if reply.add(ino, (idx + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &fuser::Request<'_>, inode: u64, flags: i32, reply: fuser::ReplyOpen) {
        let Some(name) = self.inodes.name_for(inode).map(str::to_owned) else {
            reply.error(libc::ENOENT);
            return;
        };
        if is_write_intent(flags) {
            reply.error(libc::EROFS);
            return;
        }
        // Materialize now so decode errors surface at open time.
        if let Err(e) = self.fs.read_file(&name) {
            log::warn!("open {name}: {e}");
            reply.error(e.errno());
            return;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, name);
        reply.opened(handle, 0);
    }

    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        _inode: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let Some(name) = self.handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        match self.fs.read(name, offset as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        _inode: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        self.handles.remove(&fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &fuser::Request<'_>, _inode: u64, reply: fuser::ReplyStatfs) {
        let bsize = self.fs.block_size();
        reply.statfs(
            self.fs.total_size() / bsize as u64,
            0,
            0,
            self.inodes.len() as u64,
            0,
            bsize,
            30,
            bsize,
        );
    }
}
