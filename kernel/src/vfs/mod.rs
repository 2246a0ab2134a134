// SPDX-License-Identifier: GPL-2.0

//! Virtual File System: the back-end trait, shared record types, and the
//! path/mount-table submodules (spec.md §4.3).
//!
//! A back-end is a vtable of operations plus an opaque instance (spec.md
//! §3's "File-system instance"). Here that vtable is the `FileSystem` trait
//! object; the "opaque instance pointer" is whatever state the
//! implementation closes over. `FileHandle` is the opaque per-open-file
//! token a back-end hands back from `open`/`opendir` — the VFS layer never
//! interprets it, only threads it back into later calls, mirroring the
//! teacher's "capability record + opaque instance handle" design note
//! (spec.md §9).

pub mod mode;
pub mod mount;
pub mod path;

use alloc::string::String;
use alloc::sync::Arc;

pub use mount::{MountPoint, MountTable};

use crate::driver::DriverOps;
use crate::error::Result;

/// File-open flag set (spec.md §6). Trailing `/` in a path separately marks
/// directory intent — not encoded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
	pub read: bool,
	pub write: bool,
	pub create: bool,
	pub append: bool,
	pub truncate: bool,
	pub exclusive: bool,
}

pub mod flags {
	pub const O_RDONLY: u32 = 0x0;
	pub const O_WRONLY: u32 = 0x1;
	pub const O_RDWR: u32 = 0x2;
	pub const O_CREATE: u32 = 0x4;
	pub const O_APPEND: u32 = 0x8;
	pub const O_TRUNC: u32 = 0x10;
	pub const O_EXCL: u32 = 0x20;
}

impl OpenFlags {
	/// Decode the raw `O_*` bitmask from spec.md §6.
	///
	/// Open-question decision (DESIGN.md #1): `O_CREATE` without
	/// `O_APPEND` truncates regardless of whether `O_TRUNC` is also set —
	/// `O_TRUNC` is accepted for source compatibility but not independently
	/// load-bearing.
	pub fn from_bits(bits: u32) -> Self {
		Self {
			read: bits & flags::O_WRONLY == 0,
			write: bits & (flags::O_WRONLY | flags::O_RDWR) != 0,
			create: bits & flags::O_CREATE != 0,
			append: bits & flags::O_APPEND != 0,
			truncate: bits & flags::O_TRUNC != 0,
			exclusive: bits & flags::O_EXCL != 0,
		}
	}

	/// Per spec.md §4.3: truncate to size zero iff `O_CREATE` is set and
	/// `O_APPEND` is not (DESIGN.md open-question #1).
	pub fn truncates_on_create(&self) -> bool {
		self.create && !self.append
	}
}

/// Node type reported by `stat`/`readdir` (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Regular,
	Dir,
	Device,
	Fifo,
	Link,
}

/// `stat`/`fstat` record (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
	pub dev: crate::types::DeviceId,
	pub mode: u32,
	pub uid: u32,
	pub gid: u32,
	pub size: u64,
	pub mtime: i64,
	pub node_type: NodeType,
}

/// `statfs` record: total/free block counts for the mounted back-end
/// (spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStat {
	pub total_blocks: u64,
	pub free_blocks: u64,
}

/// `getmntentry` record (spec.md §6).
#[derive(Debug, Clone)]
pub struct MountEntry {
	pub source: String,
	pub mount_path: String,
	pub fs_name: String,
	pub total_blocks: u64,
	pub free_blocks: u64,
}

/// One entry returned by `readdir`.
#[derive(Debug, Clone)]
pub struct DirEntry {
	pub name: String,
	pub node_type: NodeType,
	pub size: u64,
}

/// Opaque per-open-file/dir token a back-end assigns from `open`/`opendir`
/// and interprets in every later call against that handle. The VFS layer
/// only threads this value through; it never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileHandle(pub u64);

/// A mounted file-system back-end's vtable (spec.md §3/§4.3). Every
/// operation returns a `spec.md` §7 error kind on failure; the VFS adds no
/// retries and leaves observable state unchanged except for remove-at-close
/// (spec.md §4.3).
pub trait FileSystem: Send + Sync {
	/// Run once when the back-end is mounted.
	fn init(&self) -> Result<()> {
		Ok(())
	}

	/// Run once when the back-end is unmounted (`open_file_count() == 0`
	/// is already guaranteed by the mount table).
	fn release(&self) -> Result<()> {
		Ok(())
	}

	fn open(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<FileHandle>;
	fn close(&self, handle: FileHandle) -> Result<()>;
	fn read(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize>;
	fn write(&self, handle: &FileHandle, offset: u64, buf: &[u8]) -> Result<usize>;

	fn stat(&self, path: &str) -> Result<FileStat>;
	fn fstat(&self, handle: &FileHandle) -> Result<FileStat>;
	fn statfs(&self) -> Result<FsStat>;

	fn mkdir(&self, path: &str, mode: u32) -> Result<()>;
	fn mknod(&self, path: &str, mode: u32, driver: Arc<dyn DriverOps>) -> Result<()>;
	fn mkfifo(&self, path: &str, mode: u32) -> Result<()>;

	fn opendir(&self, path: &str) -> Result<FileHandle>;
	fn closedir(&self, handle: FileHandle) -> Result<()>;
	fn readdir(&self, handle: &FileHandle, seek: usize) -> Result<Option<DirEntry>>;

	fn remove(&self, path: &str) -> Result<()>;
	fn rename(&self, old: &str, new: &str) -> Result<()>;
	fn chmod(&self, path: &str, mode: u32) -> Result<()>;
	fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()>;

	fn ioctl(&self, handle: &FileHandle, cmd: u32, arg: usize) -> Result<isize>;
	fn flush(&self, handle: &FileHandle) -> Result<()>;
	fn sync(&self) -> Result<()> {
		Ok(())
	}

	/// Count of handles currently open against this instance; `umount`
	/// refuses while this is nonzero (spec.md §3 Invariant/EBUSY).
	fn open_file_count(&self) -> usize;
}

/// An open file, bound to the mount it was opened through and carrying the
/// VFS-level cursor `fseek`/`fread`/`fwrite` advance (the back-end's
/// `FileHandle` is opaque and offset-explicit; the cursor itself is generic
/// VFS state, not back-end state).
pub struct VfsFile {
	pub mount: Arc<MountPoint>,
	pub handle: FileHandle,
	pub cursor: u64,
}

/// An open directory traversal, analogous to `VfsFile`.
pub struct VfsDir {
	pub mount: Arc<MountPoint>,
	pub handle: FileHandle,
	pub seek: usize,
}

/// Seek whence values (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
	Set,
	Cur,
	End,
}

/// The top-level VFS: a mount table plus the path-resolution glue that
/// turns an absolute or relative path into a `(back-end, re-rooted path)`
/// pair (spec.md §4.3's "mount resolution").
pub struct Vfs {
	pub mounts: MountTable,
}

impl Vfs {
	pub const fn new() -> Self {
		Self {
			mounts: MountTable::new(),
		}
	}

	pub fn mount(&self, source: &str, path: &str, name: &str, fs: Arc<dyn FileSystem>) -> Result<()> {
		self.mounts.mount(source, path, name, fs)
	}

	pub fn umount(&self, path: &str) -> Result<()> {
		self.mounts.umount(path)
	}

	/// Resolve an absolute path to its back-end and re-rooted path.
	pub fn resolve(&self, abs_path: &str) -> Result<(Arc<MountPoint>, String)> {
		self.mounts.resolve(abs_path)
	}

	pub fn getmntentry(&self, index: usize) -> Result<MountEntry> {
		let entries = self.mounts.entries();
		let mp = entries.get(index).ok_or(crate::error::Error::ENOENT)?;
		let stat = mp.fs.statfs()?;
		Ok(MountEntry {
			source: mp.source.clone(),
			mount_path: mp.path.clone(),
			fs_name: mp.name.clone(),
			total_blocks: stat.total_blocks,
			free_blocks: stat.free_blocks,
		})
	}

	pub fn sync(&self) -> Result<()> {
		self.mounts.sync_all()
	}

	/// `fopen` (spec.md §6): resolve `path` against the mount table and
	/// open it through the owning back-end, truncating per
	/// `OpenFlags::truncates_on_create` (DESIGN.md open-question #1). The
	/// back-end's `open` is offset-explicit and keeps no cursor of its own,
	/// so `O_APPEND` positioning ("it must position the cursor at EOF iff
	/// `O_APPEND` is set", spec.md §4.3) is this facade's job: seek to the
	/// file's current size before handing the handle back.
	pub fn fopen(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<VfsFile> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		let handle = mount.fs.open(&rel, flags, mode)?;
		let cursor = if flags.append {
			mount.fs.fstat(&handle)?.size
		} else {
			0
		};
		Ok(VfsFile {
			mount,
			handle,
			cursor,
		})
	}

	pub fn fclose(&self, file: VfsFile) -> Result<()> {
		file.mount.fs.close(file.handle)
	}

	/// `fread`: reads at the file's cursor and advances it by the number
	/// of bytes actually read.
	pub fn fread(&self, file: &mut VfsFile, buf: &mut [u8]) -> Result<usize> {
		let n = file.mount.fs.read(&file.handle, file.cursor, buf)?;
		file.cursor += n as u64;
		Ok(n)
	}

	/// `fwrite`: writes at the file's cursor and advances it by the number
	/// of bytes actually written.
	pub fn fwrite(&self, file: &mut VfsFile, buf: &[u8]) -> Result<usize> {
		let n = file.mount.fs.write(&file.handle, file.cursor, buf)?;
		file.cursor += n as u64;
		Ok(n)
	}

	/// `fseek` (spec.md §6). `Whence::End` requires an `fstat` round trip
	/// to learn the current size.
	pub fn fseek(&self, file: &mut VfsFile, offset: i64, whence: Whence) -> Result<u64> {
		let base = match whence {
			Whence::Set => 0,
			Whence::Cur => file.cursor,
			Whence::End => file.mount.fs.fstat(&file.handle)?.size,
		};
		let new_cursor = base as i64 + offset;
		if new_cursor < 0 {
			return Err(crate::error::Error::EINVAL);
		}
		file.cursor = new_cursor as u64;
		Ok(file.cursor)
	}

	pub fn fioctl(&self, file: &VfsFile, cmd: u32, arg: usize) -> Result<isize> {
		file.mount.fs.ioctl(&file.handle, cmd, arg)
	}

	pub fn fflush(&self, file: &VfsFile) -> Result<()> {
		file.mount.fs.flush(&file.handle)
	}

	pub fn fstat(&self, file: &VfsFile) -> Result<FileStat> {
		file.mount.fs.fstat(&file.handle)
	}

	pub fn stat(&self, path: &str) -> Result<FileStat> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.stat(&rel)
	}

	pub fn statfs(&self, path: &str) -> Result<FsStat> {
		let (mount, _rel) = self.resolve(path)?;
		mount.fs.statfs()
	}

	pub fn opendir(&self, path: &str) -> Result<VfsDir> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		let handle = mount.fs.opendir(&rel)?;
		Ok(VfsDir {
			mount,
			handle,
			seek: 0,
		})
	}

	pub fn closedir(&self, dir: VfsDir) -> Result<()> {
		dir.mount.fs.closedir(dir.handle)
	}

	/// `readdir`: returns the next entry and advances the directory's
	/// internal seek cursor, or `None` at end-of-directory.
	pub fn readdir(&self, dir: &mut VfsDir) -> Result<Option<DirEntry>> {
		let entry = dir.mount.fs.readdir(&dir.handle, dir.seek)?;
		if entry.is_some() {
			dir.seek += 1;
		}
		Ok(entry)
	}

	pub fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.mkdir(&rel, mode)
	}

	pub fn mkfifo(&self, path: &str, mode: u32) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.mkfifo(&rel, mode)
	}

	pub fn mknod(&self, path: &str, mode: u32, driver: Arc<dyn DriverOps>) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.mknod(&rel, mode, driver)
	}

	pub fn remove(&self, path: &str) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.remove(&rel)
	}

	/// `rename`: both paths must resolve to the same mounted back-end —
	/// cross-back-end rename is `EPERM` (spec.md §4.4).
	pub fn rename(&self, old: &str, new: &str) -> Result<()> {
		path::validate(old)?;
		path::validate(new)?;
		let (old_mount, old_rel) = self.resolve(old)?;
		let (new_mount, new_rel) = self.resolve(new)?;
		if !Arc::ptr_eq(&old_mount, &new_mount) {
			return Err(crate::error::Error::EXDEV);
		}
		old_mount.fs.rename(&old_rel, &new_rel)
	}

	pub fn chmod(&self, path: &str, mode: u32) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.chmod(&rel, mode)
	}

	pub fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
		path::validate(path)?;
		let (mount, rel) = self.resolve(path)?;
		mount.fs.chown(&rel, uid, gid)
	}
}

/// Process-wide VFS singleton (spec.md §9 — "global mutable state ... is
/// a module-level singleton with explicit init/teardown").
pub static VFS: Vfs = Vfs::new();

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_flags_truncates_on_create_without_append() {
		let f = OpenFlags::from_bits(flags::O_CREATE | flags::O_WRONLY);
		assert!(f.truncates_on_create());
	}

	#[test]
	fn open_flags_does_not_truncate_with_append() {
		let f = OpenFlags::from_bits(flags::O_CREATE | flags::O_APPEND | flags::O_WRONLY);
		assert!(!f.truncates_on_create());
	}

	#[test]
	fn open_flags_decodes_read_write() {
		let f = OpenFlags::from_bits(flags::O_RDWR);
		assert!(f.read);
		assert!(f.write);
	}

	// Integration coverage through the full `Vfs` facade, against real
	// `Lfs` back-ends rather than the `StubFs` `mount.rs` uses — exercises
	// spec.md §8 scenario 3 ("mount-point lookup") end to end. A fresh
	// `Vfs` instance is used throughout rather than the crate-wide `VFS`
	// singleton, since `cargo test` runs test functions concurrently and
	// mutating one shared mount table across them would race.
	use crate::lfs::Lfs;
	use alloc::sync::Arc;

	fn two_mount_vfs() -> Vfs {
		let vfs = Vfs::new();
		vfs.mount("none", "/", "lfs", Arc::new(Lfs::new())).unwrap();
		vfs.mount("none", "/tmp", "lfs", Arc::new(Lfs::new())).unwrap();
		vfs
	}

	#[test]
	fn mount_point_lookup_routes_to_independent_backend_instances() {
		let vfs = two_mount_vfs();

		let mut outer = vfs.fopen("/x", OpenFlags::from_bits(flags::O_RDWR | flags::O_CREATE), 0o644).unwrap();
		vfs.fwrite(&mut outer, b"outer").unwrap();

		let mut inner = vfs.fopen("/tmp/x", OpenFlags::from_bits(flags::O_RDWR | flags::O_CREATE), 0o644).unwrap();
		vfs.fwrite(&mut inner, b"in").unwrap();

		assert_eq!(vfs.stat("/x").unwrap().size, 5);
		assert_eq!(vfs.stat("/tmp/x").unwrap().size, 2);

		vfs.fclose(outer).unwrap();
		vfs.fclose(inner).unwrap();
	}

	#[test]
	fn fopen_fwrite_fseek_fread_round_trips_through_the_facade() {
		let vfs = two_mount_vfs();
		let mut f = vfs.fopen("/a", OpenFlags::from_bits(flags::O_RDWR | flags::O_CREATE), 0o644).unwrap();
		vfs.fwrite(&mut f, b"hello").unwrap();
		vfs.fseek(&mut f, 0, Whence::Set).unwrap();
		let mut buf = [0u8; 5];
		assert_eq!(vfs.fread(&mut f, &mut buf).unwrap(), 5);
		assert_eq!(&buf, b"hello");
		vfs.fclose(f).unwrap();
	}

	#[test]
	fn rename_across_different_mounts_is_exdev() {
		let vfs = two_mount_vfs();
		let f = vfs.fopen("/a", OpenFlags::from_bits(flags::O_RDWR | flags::O_CREATE), 0o644).unwrap();
		vfs.fclose(f).unwrap();
		assert_eq!(
			vfs.rename("/a", "/tmp/a"),
			Err(crate::error::Error::EXDEV)
		);
	}

	#[test]
	fn umount_with_open_file_is_ebusy_and_mount_survives() {
		let vfs = two_mount_vfs();
		let f = vfs.fopen("/a", OpenFlags::from_bits(flags::O_RDWR | flags::O_CREATE), 0o644).unwrap();
		assert_eq!(vfs.umount("/"), Err(crate::error::Error::EBUSY));
		vfs.fclose(f).unwrap();
		vfs.umount("/").unwrap();
	}
}
