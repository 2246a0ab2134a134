// SPDX-License-Identifier: GPL-2.0

//! Kernel prelude — commonly used types and traits.

// Re-export macros
pub use alloc::vec;
// Re-export common alloc types
pub use alloc::{
	boxed::Box,
	collections::{BTreeMap, BTreeSet},
	format,
	string::{String, ToString},
	vec::Vec,
};
// Re-export core types
pub use core::{
	fmt, mem,
	option::Option::{self, None, Some},
	ptr,
	result::Result as CoreResult,
	slice, str,
};

pub use crate::driver::DriverOps;
pub use crate::error::{Error, Result};
pub use crate::process::{Process, Thread};
pub use crate::sync::{Mutex, RwLock, Spinlock};
pub use crate::types::*;
