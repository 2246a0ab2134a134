// SPDX-License-Identifier: GPL-2.0

//! LFS — the in-RAM file system (spec.md §4.4).
//!
//! Grounded on `original_source/src/system/fs/lfs/lfs.c`'s node/opened-file
//! shape: a tree of nodes (directory / regular / device / FIFO) where
//! children are owned exclusively by their parent directory and a child's
//! back-reference to its parent is a non-owning arena index rather than a
//! strong pointer (spec.md §9's cyclic-structure design note — this avoids
//! `Arc` reference cycles between parent and child).

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::CONFIG;
use crate::driver::DriverOps;
use crate::error::{Error, Result};
use crate::sched::Queue;
use crate::sync::Mutex;
use crate::types::DeviceId;
use crate::vfs::path::{has_trailing_slash, segments, split_parent};
use crate::vfs::{DirEntry, FileHandle, FileStat, FileSystem, FsStat, NodeType, OpenFlags};

type NodeId = usize;

const ROOT: NodeId = 0;
/// Reported `st_size` for a directory node — there is no meaningful byte
/// length for a directory, so this is the node header's own footprint.
const DIR_HEADER_SIZE: u64 = core::mem::size_of::<LfsNode>() as u64;

struct RegularFile {
	/// `None` models "no buffer yet" (a brand-new, never-written file) and
	/// also the invariant-violation the source can leave behind when an
	/// allocation fails mid-write (spec.md §9, DESIGN.md open question #2):
	/// `data == None && size > 0`. `write` repairs that state by resetting
	/// `size` to 0 before proceeding, rather than refusing the call.
	data: Option<Vec<u8>>,
	size: u64,
}

impl RegularFile {
	fn new() -> Self {
		Self {
			data: None,
			size: 0,
		}
	}

	/// Write algorithm from spec.md §4.4.
	fn write(&mut self, offset: u64, buf: &[u8]) -> usize {
		if self.data.is_none() && self.size > 0 {
			// Repair the "null data, positive size" invariant violation
			// (DESIGN.md open question #2) rather than refusing the write.
			self.size = 0;
		}

		let l = self.size;
		let o = offset.min(l);
		let w = buf.len() as u64;
		if w == 0 {
			return 0;
		}

		if o + w > l || self.data.is_none() {
			let new_len = (o + w) as usize;
			let mut new_buf = alloc::vec![0u8; new_len];
			if let Some(old) = &self.data {
				let keep = (o as usize).min(old.len());
				new_buf[..keep].copy_from_slice(&old[..keep]);
			}
			new_buf[o as usize..new_len].copy_from_slice(buf);
			self.data = Some(new_buf);
			self.size = new_len as u64;
		} else {
			let data = self.data.as_mut().unwrap();
			data[o as usize..(o + w) as usize].copy_from_slice(buf);
		}
		w as usize
	}

	/// Read algorithm from spec.md §4.4.
	fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
		if offset >= self.size {
			return 0;
		}
		let avail = (self.size - offset) as usize;
		let n = buf.len().min(avail);
		match &self.data {
			Some(data) => buf[..n].copy_from_slice(&data[offset as usize..offset as usize + n]),
			None => buf[..n].fill(0),
		}
		n
	}
}

enum NodeKind {
	Dir(Vec<NodeId>),
	Regular(RegularFile),
	Device(Arc<dyn DriverOps>),
	Fifo(Queue<u8>),
}

struct LfsNode {
	name: String,
	mode: u32,
	uid: u32,
	gid: u32,
	mtime: i64,
	parent: Option<NodeId>,
	/// Set by `remove` on a regular file that still has open handles
	/// (Invariant L2). A remove-at-close node is skipped by name lookup
	/// (so `stat`/`open` report `ENOENT`) but stays linked in its parent's
	/// child list — and thus in the arena — until the last handle closes
	/// (Invariant L3).
	remove_at_close: bool,
	open_count: usize,
	kind: NodeKind,
}

impl LfsNode {
	fn node_type(&self) -> NodeType {
		match &self.kind {
			NodeKind::Dir(_) => NodeType::Dir,
			NodeKind::Regular(_) => NodeType::Regular,
			NodeKind::Device(_) => NodeType::Device,
			NodeKind::Fifo(_) => NodeType::Fifo,
		}
	}

	fn size(&self) -> u64 {
		match &self.kind {
			NodeKind::Dir(_) => DIR_HEADER_SIZE,
			NodeKind::Regular(r) => r.size,
			NodeKind::Device(d) => d.size(),
			NodeKind::Fifo(q) => q.len() as u64,
		}
	}
}

struct OpenFile {
	node: NodeId,
}

struct LfsInner {
	nodes: Vec<Option<LfsNode>>,
	open_files: BTreeMap<u64, OpenFile>,
	open_dirs: BTreeMap<u64, NodeId>,
	next_handle: u64,
}

impl LfsInner {
	fn new() -> Self {
		let root = LfsNode {
			name: String::new(),
			mode: 0o755,
			uid: 0,
			gid: 0,
			mtime: 0,
			parent: None,
			remove_at_close: false,
			open_count: 0,
			kind: NodeKind::Dir(Vec::new()),
		};
		Self {
			nodes: alloc::vec![Some(root)],
			open_files: BTreeMap::new(),
			open_dirs: BTreeMap::new(),
			next_handle: 1,
		}
	}

	fn node(&self, id: NodeId) -> &LfsNode {
		self.nodes[id].as_ref().expect("dangling LFS node id")
	}

	fn node_mut(&mut self, id: NodeId) -> &mut LfsNode {
		self.nodes[id].as_mut().expect("dangling LFS node id")
	}

	/// Look up `name` among `dir`'s children, skipping remove-at-close
	/// entries (Invariant L1 uniqueness + the lookup-hides-pending-removal
	/// behavior spec.md §8 scenario 2 depends on).
	fn find_child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
		match &self.node(dir).kind {
			NodeKind::Dir(children) => children.iter().copied().find(|&c| {
				let n = self.node(c);
				n.name == name && !n.remove_at_close
			}),
			_ => None,
		}
	}

	fn resolve(&self, path: &str) -> Result<NodeId> {
		let mut cur = ROOT;
		for seg in segments(path) {
			if !matches!(self.node(cur).kind, NodeKind::Dir(_)) {
				return Err(Error::ENOTDIR);
			}
			cur = self.find_child(cur, seg).ok_or(Error::ENOENT)?;
		}
		Ok(cur)
	}

	fn alloc_node(&mut self, node: LfsNode) -> NodeId {
		self.nodes.push(Some(node));
		self.nodes.len() - 1
	}

	fn alloc_handle(&mut self) -> u64 {
		let h = self.next_handle;
		self.next_handle += 1;
		h
	}

	fn create_child(&mut self, parent: NodeId, name: &str, mode: u32, kind: NodeKind) -> Result<NodeId> {
		if !matches!(self.node(parent).kind, NodeKind::Dir(_)) {
			return Err(Error::ENOTDIR);
		}
		if self.find_child(parent, name).is_some() {
			return Err(Error::EEXIST);
		}
		let mtime = crate::time::get_time().tv_sec;
		let id = self.alloc_node(LfsNode {
			name: name.to_string(),
			mode,
			uid: 0,
			gid: 0,
			mtime,
			parent: Some(parent),
			remove_at_close: false,
			open_count: 0,
			kind,
		});
		if let NodeKind::Dir(children) = &mut self.node_mut(parent).kind {
			children.push(id);
		}
		Ok(id)
	}

	/// Unconditionally unlink `id` from its parent's child list and free its
	/// arena slot (Invariant L3's terminal step).
	fn unlink(&mut self, id: NodeId) {
		if let Some(parent) = self.node(id).parent {
			if let NodeKind::Dir(children) = &mut self.node_mut(parent).kind {
				children.retain(|&c| c != id);
			}
		}
		self.nodes[id] = None;
	}

	fn stat_of(&self, id: NodeId) -> FileStat {
		let n = self.node(id);
		FileStat {
			dev: DeviceId::new(0, 0),
			mode: n.mode,
			uid: n.uid,
			gid: n.gid,
			size: n.size(),
			mtime: n.mtime,
			node_type: n.node_type(),
		}
	}
}

/// The in-RAM file-system back-end. One instance per mount; a single
/// instance-wide lock serializes every operation (spec.md §4.4's
/// "concurrency" paragraph).
pub struct Lfs {
	inner: Mutex<LfsInner>,
}

impl Lfs {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(LfsInner::new()),
		}
	}
}

impl Default for Lfs {
	fn default() -> Self {
		Self::new()
	}
}

impl FileSystem for Lfs {
	fn open(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<FileHandle> {
		let mut inner = self.inner.lock();
		let is_dir_path = has_trailing_slash(path);

		let existing = inner.resolve(path);
		let node = match existing {
			Ok(id) => {
				if flags.exclusive && flags.create {
					return Err(Error::EEXIST);
				}
				id
			}
			Err(Error::ENOENT) if flags.create => {
				let (parent_path, name) = split_parent(path)?;
				let parent = inner.resolve(&parent_path)?;
				inner.create_child(parent, &name, mode, NodeKind::Regular(RegularFile::new()))?
			}
			Err(e) => return Err(e),
		};

		let node_type = inner.node(node).node_type();
		if is_dir_path && node_type != NodeType::Dir {
			return Err(Error::ENOTDIR);
		}
		if node_type == NodeType::Dir {
			return Err(Error::EISDIR);
		}

		if flags.truncates_on_create() && flags.create {
			if let NodeKind::Regular(r) = &mut inner.node_mut(node).kind {
				r.data = None;
				r.size = 0;
			}
		}

		inner.node_mut(node).open_count += 1;
		let handle = inner.alloc_handle();
		inner.open_files.insert(handle, OpenFile { node });
		Ok(FileHandle(handle))
	}

	fn close(&self, handle: FileHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		let of = inner.open_files.remove(&handle.0).ok_or(Error::ENOENT)?;
		let node_id = of.node;
		let node = inner.node_mut(node_id);
		node.open_count = node.open_count.saturating_sub(1);
		if node.remove_at_close && node.open_count == 0 {
			inner.unlink(node_id);
		}
		Ok(())
	}

	fn read(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize> {
		let mut inner = self.inner.lock();
		let node_id = inner.open_files.get(&handle.0).ok_or(Error::ENOENT)?.node;
		match &mut inner.node_mut(node_id).kind {
			NodeKind::Regular(r) => Ok(r.read(offset, buf)),
			NodeKind::Device(d) => d.read(buf),
			NodeKind::Fifo(q) => {
				let mut n = 0;
				while n < buf.len() {
					match q.try_receive() {
						Some(byte) => {
							buf[n] = byte;
							n += 1;
						}
						None => break,
					}
				}
				Ok(n)
			}
			NodeKind::Dir(_) => Err(Error::EISDIR),
		}
	}

	fn write(&self, handle: &FileHandle, offset: u64, buf: &[u8]) -> Result<usize> {
		let mut inner = self.inner.lock();
		let node_id = inner.open_files.get(&handle.0).ok_or(Error::ENOENT)?.node;
		let mtime = crate::time::get_time().tv_sec;
		let result = match &mut inner.node_mut(node_id).kind {
			NodeKind::Regular(r) => Ok(r.write(offset, buf)),
			NodeKind::Device(d) => d.write(buf),
			NodeKind::Fifo(q) => {
				let mut n = 0;
				for &byte in buf {
					if q.try_send(byte).is_err() {
						break;
					}
					n += 1;
				}
				Ok(n)
			}
			NodeKind::Dir(_) => Err(Error::EISDIR),
		};
		if result.is_ok() {
			inner.node_mut(node_id).mtime = mtime;
		}
		result
	}

	fn stat(&self, path: &str) -> Result<FileStat> {
		let inner = self.inner.lock();
		if has_trailing_slash(path) {
			let id = inner.resolve(path)?;
			if inner.node(id).node_type() != NodeType::Dir {
				return Err(Error::ENOTDIR);
			}
			return Ok(inner.stat_of(id));
		}
		let id = inner.resolve(path)?;
		Ok(inner.stat_of(id))
	}

	fn fstat(&self, handle: &FileHandle) -> Result<FileStat> {
		let inner = self.inner.lock();
		let node_id = inner.open_files.get(&handle.0).ok_or(Error::ENOENT)?.node;
		Ok(inner.stat_of(node_id))
	}

	fn statfs(&self) -> Result<FsStat> {
		Ok(FsStat {
			total_blocks: u64::MAX,
			free_blocks: u64::MAX,
		})
	}

	fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
		let mut inner = self.inner.lock();
		let (parent_path, name) = split_parent(path)?;
		let parent = inner.resolve(&parent_path)?;
		inner.create_child(parent, &name, mode, NodeKind::Dir(Vec::new()))?;
		Ok(())
	}

	fn mknod(&self, path: &str, mode: u32, driver: Arc<dyn DriverOps>) -> Result<()> {
		let mut inner = self.inner.lock();
		let (parent_path, name) = split_parent(path)?;
		let parent = inner.resolve(&parent_path)?;
		inner.create_child(parent, &name, mode, NodeKind::Device(driver))?;
		Ok(())
	}

	fn mkfifo(&self, path: &str, mode: u32) -> Result<()> {
		let mut inner = self.inner.lock();
		let (parent_path, name) = split_parent(path)?;
		let parent = inner.resolve(&parent_path)?;
		inner.create_child(parent, &name, mode, NodeKind::Fifo(Queue::new(CONFIG.fifo_capacity)))?;
		Ok(())
	}

	fn opendir(&self, path: &str) -> Result<FileHandle> {
		let mut inner = self.inner.lock();
		let id = inner.resolve(path)?;
		if inner.node(id).node_type() != NodeType::Dir {
			return Err(Error::ENOTDIR);
		}
		inner.node_mut(id).open_count += 1;
		let handle = inner.alloc_handle();
		inner.open_dirs.insert(handle, id);
		Ok(FileHandle(handle))
	}

	fn closedir(&self, handle: FileHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		let id = inner.open_dirs.remove(&handle.0).ok_or(Error::ENOENT)?;
		inner.node_mut(id).open_count = inner.node(id).open_count.saturating_sub(1);
		Ok(())
	}

	fn readdir(&self, handle: &FileHandle, seek: usize) -> Result<Option<DirEntry>> {
		let inner = self.inner.lock();
		let dir_id = *inner.open_dirs.get(&handle.0).ok_or(Error::ENOENT)?;
		let children = match &inner.node(dir_id).kind {
			NodeKind::Dir(c) => c,
			_ => return Err(Error::ENOTDIR),
		};
		let visible: Vec<NodeId> = children
			.iter()
			.copied()
			.filter(|&c| !inner.node(c).remove_at_close)
			.collect();
		match visible.get(seek) {
			Some(&id) => {
				let n = inner.node(id);
				Ok(Some(DirEntry {
					name: n.name.clone(),
					node_type: n.node_type(),
					size: n.size(),
				}))
			}
			None => Ok(None),
		}
	}

	fn remove(&self, path: &str) -> Result<()> {
		let mut inner = self.inner.lock();
		let id = inner.resolve(path)?;
		let node = inner.node(id);
		match &node.kind {
			NodeKind::Dir(children) => {
				if !children.is_empty() {
					return Err(Error::EBUSY);
				}
				inner.unlink(id);
			}
			NodeKind::Regular(_) => {
				if node.open_count > 0 {
					inner.node_mut(id).remove_at_close = true;
				} else {
					inner.unlink(id);
				}
			}
			NodeKind::Device(_) | NodeKind::Fifo(_) => {
				inner.unlink(id);
			}
		}
		Ok(())
	}

	fn rename(&self, old: &str, new: &str) -> Result<()> {
		if has_trailing_slash(old) || has_trailing_slash(new) {
			return Err(Error::EPERM);
		}
		let mut inner = self.inner.lock();
		let id = inner.resolve(old)?;
		let (old_parent_path, _) = split_parent(old)?;
		let (new_parent_path, new_name) = split_parent(new)?;
		let old_parent = inner.resolve(&old_parent_path)?;
		let new_parent = inner.resolve(&new_parent_path)?;
		if old_parent != new_parent {
			return Err(Error::EPERM);
		}
		if inner.find_child(new_parent, &new_name).is_some() {
			return Err(Error::EEXIST);
		}
		inner.node_mut(id).name = new_name;
		Ok(())
	}

	fn chmod(&self, path: &str, mode: u32) -> Result<()> {
		let mut inner = self.inner.lock();
		let id = inner.resolve(path)?;
		inner.node_mut(id).mode = mode;
		Ok(())
	}

	fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
		let mut inner = self.inner.lock();
		let id = inner.resolve(path)?;
		let n = inner.node_mut(id);
		n.uid = uid;
		n.gid = gid;
		Ok(())
	}

	fn ioctl(&self, handle: &FileHandle, cmd: u32, arg: usize) -> Result<isize> {
		let mut inner = self.inner.lock();
		let node_id = inner.open_files.get(&handle.0).ok_or(Error::ENOENT)?.node;
		match &mut inner.node_mut(node_id).kind {
			NodeKind::Device(d) => d.ioctl(cmd, arg),
			_ => Err(Error::EPERM),
		}
	}

	fn flush(&self, handle: &FileHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		let node_id = inner.open_files.get(&handle.0).ok_or(Error::ENOENT)?.node;
		match &mut inner.node_mut(node_id).kind {
			NodeKind::Device(d) => d.flush(),
			_ => Ok(()),
		}
	}

	fn open_file_count(&self) -> usize {
		let inner = self.inner.lock();
		inner.open_files.len() + inner.open_dirs.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vfs::flags;

	fn wflags(bits: u32) -> OpenFlags {
		OpenFlags::from_bits(bits)
	}

	#[test]
	fn basic_rw_round_trip() {
		let fs = Lfs::new();
		let h = fs
			.open("/a", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		assert_eq!(fs.write(&h, 0, b"hello").unwrap(), 5);
		let mut buf = [0u8; 5];
		assert_eq!(fs.read(&h, 0, &mut buf).unwrap(), 5);
		assert_eq!(&buf, b"hello");
		fs.close(h).unwrap();
		fs.remove("/a").unwrap();
		assert_eq!(fs.stat("/a").unwrap_err(), Error::ENOENT);
	}

	#[test]
	fn remove_at_close_keeps_data_reachable_via_open_handle() {
		let fs = Lfs::new();
		let h1 = fs
			.open("/b", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.write(&h1, 0, b"x").unwrap();
		let h2 = fs.open("/b", wflags(flags::O_RDONLY), 0).unwrap();

		fs.remove("/b").unwrap();
		assert_eq!(fs.stat("/b").unwrap_err(), Error::ENOENT);

		let mut buf = [0u8; 1];
		assert_eq!(fs.read(&h2, 0, &mut buf).unwrap(), 1);

		fs.close(h1).unwrap();
		fs.close(h2).unwrap();
		// Node is now fully unlinked; a fresh create succeeds.
		let h3 = fs
			.open("/b", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		let mut buf2 = [0u8; 1];
		assert_eq!(fs.read(&h3, 0, &mut buf2).unwrap(), 0);
	}

	#[test]
	fn write_past_end_extends_and_overwrite_in_place_does_not() {
		let fs = Lfs::new();
		let h = fs
			.open("/c", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.write(&h, 0, b"0123").unwrap();
		fs.write(&h, 1, b"AB").unwrap();
		let mut buf = [0u8; 4];
		fs.read(&h, 0, &mut buf).unwrap();
		assert_eq!(&buf, b"0AB3");
		assert_eq!(fs.fstat(&h).unwrap().size, 4);
	}

	#[test]
	fn read_at_or_past_eof_returns_zero_not_error() {
		let fs = Lfs::new();
		let h = fs
			.open("/d", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.write(&h, 0, b"ab").unwrap();
		let mut buf = [0u8; 4];
		assert_eq!(fs.read(&h, 10, &mut buf).unwrap(), 0);
	}

	#[test]
	fn zero_length_write_does_not_modify_file() {
		let fs = Lfs::new();
		let h = fs
			.open("/e", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.write(&h, 0, b"abc").unwrap();
		fs.write(&h, 0, b"").unwrap();
		assert_eq!(fs.fstat(&h).unwrap().size, 3);
	}

	#[test]
	fn mkdir_then_empty_remove_leaves_parent_child_count_unchanged() {
		let fs = Lfs::new();
		fs.mkdir("/p", 0o755).unwrap();
		let d = fs.opendir("/p").unwrap();
		fs.closedir(d).unwrap();
		fs.remove("/p").unwrap();

		let root_children_before = fs.opendir("/").unwrap();
		let mut count = 0;
		while fs.readdir(&root_children_before, count).unwrap().is_some() {
			count += 1;
		}
		fs.closedir(root_children_before).unwrap();
		assert_eq!(count, 0);
	}

	#[test]
	fn remove_of_nonempty_directory_fails() {
		let fs = Lfs::new();
		fs.mkdir("/p", 0o755).unwrap();
		fs.mkdir("/p/q", 0o755).unwrap();
		assert_eq!(fs.remove("/p"), Err(Error::EBUSY));
	}

	#[test]
	fn rename_across_directories_is_rejected() {
		let fs = Lfs::new();
		fs.mkdir("/p", 0o755).unwrap();
		let h = fs
			.open("/a", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.close(h).unwrap();
		assert_eq!(fs.rename("/a", "/p/a"), Err(Error::EPERM));
	}

	#[test]
	fn rename_to_existing_destination_is_eexist() {
		let fs = Lfs::new();
		for name in ["/a", "/b"] {
			let h = fs
				.open(name, wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
				.unwrap();
			fs.close(h).unwrap();
		}
		assert_eq!(fs.rename("/a", "/b"), Err(Error::EEXIST));
	}

	#[test]
	fn chmod_then_stat_reports_new_mode() {
		let fs = Lfs::new();
		let h = fs
			.open("/a", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.close(h).unwrap();
		fs.chmod("/a", 0o600).unwrap();
		assert_eq!(fs.stat("/a").unwrap().mode, 0o600);
	}

	#[test]
	fn open_without_create_on_missing_path_is_enoent() {
		let fs = Lfs::new();
		assert_eq!(
			fs.open("/missing", wflags(flags::O_RDONLY), 0).unwrap_err(),
			Error::ENOENT
		);
	}

	#[test]
	fn stat_via_trailing_slash_on_regular_file_fails() {
		let fs = Lfs::new();
		let h = fs
			.open("/a", wflags(flags::O_RDWR | flags::O_CREATE), 0o644)
			.unwrap();
		fs.close(h).unwrap();
		assert_eq!(fs.stat("/a/").unwrap_err(), Error::ENOTDIR);
	}
}
