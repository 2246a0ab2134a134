// SPDX-License-Identifier: GPL-2.0

//! Mount table: an ordered list of mount points, each mapping a prefix path
//! to a back-end instance (spec.md §3/§4.3).
//!
//! Invariant V1: no mount-point prefix equals another; longest-match is
//! unique. The root must be mounted before any syscall can succeed.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::sync::Mutex;
use crate::vfs::path::segments;
use crate::vfs::FileSystem;

/// One entry in the mount table: a back-end rooted at `path`.
pub struct MountPoint {
	/// Mount path, e.g. `/` or `/tmp`. Never has a trailing slash except
	/// for the root itself.
	pub path: String,
	/// Source string recorded for `getmntentry` (spec.md §6); purely
	/// descriptive, e.g. `"none"` or a device name.
	pub source: String,
	/// Back-end name, e.g. `"lfs"`, `"devfs"`.
	pub name: String,
	pub fs: Arc<dyn FileSystem>,
}

/// The VFS mount table. Longest-prefix lookup (Invariant V1) decides which
/// back-end a path dispatches to.
pub struct MountTable {
	mounts: Mutex<Vec<Arc<MountPoint>>>,
}

impl MountTable {
	pub const fn new() -> Self {
		Self {
			mounts: Mutex::new(Vec::new()),
		}
	}

	/// Mount `fs` at `path`. Fails with `EEXIST` if `path` is already a
	/// mount point (Invariant V1).
	pub fn mount(&self, source: &str, path: &str, name: &str, fs: Arc<dyn FileSystem>) -> Result<()> {
		let normalized = normalize(path);
		let mut mounts = self.mounts.lock();
		if mounts.iter().any(|m| m.path == normalized) {
			return Err(Error::EEXIST);
		}
		fs.init()?;
		mounts.push(Arc::new(MountPoint {
			path: normalized,
			source: source.to_string(),
			name: name.to_string(),
			fs,
		}));
		Ok(())
	}

	/// Unmount the back-end at `path`. Fails with `EBUSY` if it reports any
	/// open files, `ENOENT` if no such mount exists.
	pub fn umount(&self, path: &str) -> Result<()> {
		let normalized = normalize(path);
		let mut mounts = self.mounts.lock();
		let pos = mounts
			.iter()
			.position(|m| m.path == normalized)
			.ok_or(Error::ENOENT)?;
		if mounts[pos].fs.open_file_count() != 0 {
			return Err(Error::EBUSY);
		}
		let mp = mounts.remove(pos);
		mp.fs.release()?;
		Ok(())
	}

	/// Find the mount point whose path is the longest prefix of `path`'s
	/// leading segments (Invariant V1/V-lookup in spec.md §8). Returns the
	/// mount plus the path re-rooted against it (the portion of `path`
	/// beyond the mount prefix, always absolute from the back-end's point
	/// of view).
	pub fn resolve(&self, path: &str) -> Result<(Arc<MountPoint>, String)> {
		let mounts = self.mounts.lock();
		if mounts.is_empty() {
			return Err(Error::ENOENT);
		}
		let want = segments(path);
		let mut best: Option<&Arc<MountPoint>> = None;
		let mut best_len = 0usize;
		for mp in mounts.iter() {
			let mp_segs = segments(&mp.path);
			if mp_segs.len() > want.len() {
				continue;
			}
			if want[..mp_segs.len()] == mp_segs[..] && mp_segs.len() >= best_len {
				best = Some(mp);
				best_len = mp_segs.len();
			}
		}
		let mp = best.ok_or(Error::ENOENT)?;
		let rerooted = "/".to_string() + &want[best_len..].join("/");
		Ok((mp.clone(), rerooted))
	}

	/// Snapshot of every mount entry, for `getmntentry` seeking by index.
	pub fn entries(&self) -> Vec<Arc<MountPoint>> {
		self.mounts.lock().clone()
	}

	/// Iterate every mounted back-end's `sync` (spec.md §4.3 — "sync on the
	/// VFS iterates back-ends").
	pub fn sync_all(&self) -> Result<()> {
		for mp in self.mounts.lock().iter() {
			mp.fs.sync()?;
		}
		Ok(())
	}
}

fn normalize(path: &str) -> String {
	if path == "/" {
		return "/".to_string();
	}
	"/".to_string() + &segments(path).join("/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vfs::{DirEntry, FileHandle, FileStat, FsStat, OpenFlags};

	struct StubFs;

	impl FileSystem for StubFs {
		fn open(&self, _path: &str, _flags: OpenFlags, _mode: u32) -> Result<FileHandle> {
			Err(Error::ENOSYS)
		}
		fn close(&self, _handle: FileHandle) -> Result<()> {
			Ok(())
		}
		fn read(&self, _handle: &FileHandle, _offset: u64, _buf: &mut [u8]) -> Result<usize> {
			Ok(0)
		}
		fn write(&self, _handle: &FileHandle, _offset: u64, _buf: &[u8]) -> Result<usize> {
			Ok(0)
		}
		fn stat(&self, _path: &str) -> Result<FileStat> {
			Err(Error::ENOSYS)
		}
		fn fstat(&self, _handle: &FileHandle) -> Result<FileStat> {
			Err(Error::ENOSYS)
		}
		fn statfs(&self) -> Result<FsStat> {
			Err(Error::ENOSYS)
		}
		fn mkdir(&self, _path: &str, _mode: u32) -> Result<()> {
			Ok(())
		}
		fn mknod(&self, _path: &str, _mode: u32, _driver: Arc<dyn crate::driver::DriverOps>) -> Result<()> {
			Err(Error::ENOSYS)
		}
		fn mkfifo(&self, _path: &str, _mode: u32) -> Result<()> {
			Err(Error::ENOSYS)
		}
		fn opendir(&self, _path: &str) -> Result<FileHandle> {
			Err(Error::ENOSYS)
		}
		fn closedir(&self, _handle: FileHandle) -> Result<()> {
			Ok(())
		}
		fn readdir(&self, _handle: &FileHandle, _seek: usize) -> Result<Option<DirEntry>> {
			Ok(None)
		}
		fn remove(&self, _path: &str) -> Result<()> {
			Ok(())
		}
		fn rename(&self, _old: &str, _new: &str) -> Result<()> {
			Ok(())
		}
		fn chmod(&self, _path: &str, _mode: u32) -> Result<()> {
			Ok(())
		}
		fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> Result<()> {
			Ok(())
		}
		fn ioctl(&self, _handle: &FileHandle, _cmd: u32, _arg: usize) -> Result<isize> {
			Err(Error::ENOSYS)
		}
		fn flush(&self, _handle: &FileHandle) -> Result<()> {
			Ok(())
		}
		fn sync(&self) -> Result<()> {
			Ok(())
		}
		fn open_file_count(&self) -> usize {
			0
		}
	}

	#[test]
	fn resolve_picks_longest_matching_prefix() {
		let table = MountTable::new();
		table.mount("none", "/", "stub", Arc::new(StubFs)).unwrap();
		table
			.mount("none", "/tmp", "stub", Arc::new(StubFs))
			.unwrap();

		let (mp, rerooted) = table.resolve("/tmp/x").unwrap();
		assert_eq!(mp.path, "/tmp");
		assert_eq!(rerooted, "/x");

		let (mp, rerooted) = table.resolve("/x").unwrap();
		assert_eq!(mp.path, "/");
		assert_eq!(rerooted, "/x");
	}

	#[test]
	fn mounting_the_same_prefix_twice_is_eexist() {
		let table = MountTable::new();
		table.mount("none", "/", "stub", Arc::new(StubFs)).unwrap();
		assert_eq!(
			table.mount("none", "/", "stub", Arc::new(StubFs)),
			Err(Error::EEXIST)
		);
	}

	#[test]
	fn resolve_with_no_mounts_is_enoent() {
		let table = MountTable::new();
		assert_eq!(table.resolve("/x").unwrap_err(), Error::ENOENT);
	}

	#[test]
	fn umount_then_mount_round_trips() {
		let table = MountTable::new();
		table.mount("none", "/", "stub", Arc::new(StubFs)).unwrap();
		table.umount("/").unwrap();
		table.mount("none", "/", "stub", Arc::new(StubFs)).unwrap();
	}
}
