// SPDX-License-Identifier: GPL-2.0

//! Kernel subsystem bring-up: console sink wiring, the logger, and the
//! root/device filesystem mounts. CPU/board bring-up and interrupt
//! vectoring happen before this runs and are out of scope here (spec.md
//! §1); this is the first code that is the same regardless of what ran
//! before it.

use alloc::sync::Arc;

use crate::error::Result;

/// Bring up console output and the `log` backend. Must run before anything
/// else logs.
pub fn early_init() -> Result<()> {
	crate::console::init()?;
	crate::logging::init()?;
	log::info!("console and logging ready");
	Ok(())
}

/// Mount the in-RAM root filesystem at `/` and the device filesystem at
/// `/dev`, so syscalls that touch either are servable as soon as the first
/// process is created.
pub fn mount_root_filesystems() -> Result<()> {
	crate::vfs::VFS.mount("lfs", "/", "lfs", Arc::new(crate::lfs::Lfs::new()))?;
	crate::vfs::VFS.mount("devfs", "/dev", "devfs", Arc::new(crate::devfs::DevFs::new()))?;
	log::info!("root and device filesystems mounted");
	Ok(())
}

/// Run full kernel subsystem bring-up. The caller (the freestanding image's
/// entry point, out of scope here) is expected to create the first process
/// against the catalog and enter the given scheduler's run loop afterward.
pub fn init() -> Result<()> {
	early_init()?;
	mount_root_filesystems()?;
	log::info!("{} v{} kernel init complete", crate::NAME, crate::VERSION);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mount_root_filesystems_is_idempotent_to_call_once() {
		assert!(mount_root_filesystems().is_ok());
	}
}
