// SPDX-License-Identifier: GPL-2.0

//! Driver-registration contract consumed by `devfs::mknod`.
//!
//! Individual peripheral drivers (UART, SPI, I2C, SDSPI, USB, ETH, CRC, WDG,
//! …) are out of scope (spec.md §1) — this module only defines the
//! capability record devfs binds a new device node to: an open/close/
//! read/write/ioctl/flush/stat vtable plus an opaque instance. A concrete
//! driver crate implements `DriverOps` and hands an `Arc<dyn DriverOps>` to
//! `devfs::DevFs::mknod`.

use alloc::sync::Arc;

use crate::error::{Error, Result};

/// Capability record a character or block driver registers with devfs.
/// Mirrors the teacher's `CharDriverOps` trait, trimmed to the
/// open/close/read/write/ioctl/flush/stat surface the VFS back-end contract
/// (spec.md §4.3) requires of every file-system operation, so devfs can
/// adapt driver entry points into `FileSystem` operations uniformly.
pub trait DriverOps: Send + Sync {
	/// Called once when a handle to the node is opened.
	fn open(&self) -> Result<()> {
		Ok(())
	}

	/// Called when the last handle to the node is closed.
	fn close(&self) -> Result<()> {
		Ok(())
	}

	/// Read up to `buf.len()` bytes. Returns the number of bytes
	/// transferred; short reads are permitted (spec.md §4.3).
	fn read(&self, buf: &mut [u8]) -> Result<usize>;

	/// Write up to `buf.len()` bytes. Returns the number of bytes
	/// transferred; short writes are permitted.
	fn write(&self, buf: &[u8]) -> Result<usize>;

	/// Device-specific control operation, encoded per spec.md §6's
	/// `(group << 16) | (number & 0xFFFF)` ioctl numbering.
	fn ioctl(&self, _cmd: u32, _arg: usize) -> Result<isize> {
		Err(Error::EPERM)
	}

	/// Flush any buffered output. Devices with nothing to flush succeed.
	fn flush(&self) -> Result<()> {
		Ok(())
	}

	/// Driver's self-reported size, queried live by `stat.st_size`
	/// (spec.md §4.3 — "queried from the driver at the time of the call").
	fn size(&self) -> u64 {
		0
	}
}

/// A registered driver instance plus the name it was bound under; what
/// `devfs::mknod` stores in a node slot (spec.md §4.5's "driver vtable
/// copied into the node").
#[derive(Clone)]
pub struct DriverHandle(pub Arc<dyn DriverOps>);

impl core::fmt::Debug for DriverHandle {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("DriverHandle").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::vec;

	struct NullDriver;

	impl DriverOps for NullDriver {
		fn read(&self, _buf: &mut [u8]) -> Result<usize> {
			Ok(0)
		}

		fn write(&self, buf: &[u8]) -> Result<usize> {
			Ok(buf.len())
		}
	}

	#[test]
	fn null_driver_discards_writes_and_reads_eof() {
		let drv = DriverHandle(Arc::new(NullDriver));
		let mut buf = [0u8; 4];
		assert_eq!(drv.0.read(&mut buf).unwrap(), 0);
		assert_eq!(drv.0.write(&vec![1, 2, 3]).unwrap(), 3);
	}

	#[test]
	fn default_ioctl_is_eperm() {
		let drv = NullDriver;
		assert_eq!(drv.ioctl(0, 0), Err(Error::EPERM));
	}
}
