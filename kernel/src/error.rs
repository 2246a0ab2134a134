// SPDX-License-Identifier: GPL-2.0

//! Kernel error kinds and their errno mapping.
//!
//! The kind list matches the error-handling design in the spec exactly:
//! every variant here is user-observable through a syscall's errno slot.

use core::fmt;

/// Kernel error type. Mirrors the errno slot seen by user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// No such file, directory, or mount (ENOENT).
	ENOENT,
	/// Target already exists where uniqueness is required (EEXIST).
	EEXIST,
	/// Path-type category mismatch: expected a directory (ENOTDIR).
	ENOTDIR,
	/// Path-type category mismatch: expected a non-directory (EISDIR).
	EISDIR,
	/// Resource still in use (EBUSY).
	EBUSY,
	/// Allocation failure (ENOMEM).
	ENOMEM,
	/// Back-end capacity exhausted (ENOSPC).
	ENOSPC,
	/// Operation unsupported on this back-end or node type (EPERM).
	EPERM,
	/// Malformed arguments (EINVAL).
	EINVAL,
	/// Handle of the wrong resource type; fatal to the caller (EFAULT).
	EFAULT,
	/// Write to a read-only mount/node (EROFS).
	EROFS,
	/// Blocking primitive timed out (ETIME).
	ETIME,
	/// No such process/thread (ESRCH).
	ESRCH,
	/// Syscall id out of range, or operation intentionally unimplemented
	/// (ENOSYS).
	ENOSYS,
	/// Cross-back-end operation (EXDEV).
	EXDEV,
	/// Network error, passed through from the out-of-scope network
	/// subsystem. The payload is that subsystem's own error code.
	ENetwork(i32),
}

impl Error {
	/// Convert error to the conventional negative errno integer.
	pub fn to_errno(self) -> i32 {
		match self {
			Error::ENOENT => -2,
			Error::EEXIST => -17,
			Error::ENOTDIR => -20,
			Error::EISDIR => -21,
			Error::EBUSY => -16,
			Error::ENOMEM => -12,
			Error::ENOSPC => -28,
			Error::EPERM => -1,
			Error::EINVAL => -22,
			Error::EFAULT => -14,
			Error::EROFS => -30,
			Error::ETIME => -62,
			Error::ESRCH => -3,
			Error::ENOSYS => -38,
			Error::EXDEV => -18,
			Error::ENetwork(code) => code,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::ENOENT => write!(f, "no such file, directory, or mount"),
			Error::EEXIST => write!(f, "target already exists"),
			Error::ENOTDIR => write!(f, "not a directory"),
			Error::EISDIR => write!(f, "is a directory"),
			Error::EBUSY => write!(f, "resource busy"),
			Error::ENOMEM => write!(f, "out of memory"),
			Error::ENOSPC => write!(f, "no space left on back-end"),
			Error::EPERM => write!(f, "operation not permitted"),
			Error::EINVAL => write!(f, "invalid argument"),
			Error::EFAULT => write!(f, "wrong resource type"),
			Error::EROFS => write!(f, "read-only mount or node"),
			Error::ETIME => write!(f, "operation timed out"),
			Error::ESRCH => write!(f, "no such process or thread"),
			Error::ENOSYS => write!(f, "function not implemented"),
			Error::EXDEV => write!(f, "cross-back-end operation"),
			Error::ENetwork(code) => write!(f, "network error ({code})"),
		}
	}
}

/// Kernel result type.
pub type Result<T> = core::result::Result<T, Error>;

impl From<alloc::collections::TryReserveError> for Error {
	fn from(_: alloc::collections::TryReserveError) -> Self {
		Error::ENOMEM
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn errno_values_are_negative_and_distinct() {
		let all = [
			Error::ENOENT,
			Error::EEXIST,
			Error::ENOTDIR,
			Error::EISDIR,
			Error::EBUSY,
			Error::ENOMEM,
			Error::ENOSPC,
			Error::EPERM,
			Error::EINVAL,
			Error::EFAULT,
			Error::EROFS,
			Error::ETIME,
			Error::ESRCH,
			Error::ENOSYS,
			Error::EXDEV,
		];
		for e in all.iter() {
			assert!(e.to_errno() < 0);
		}
	}

	#[test]
	fn network_error_passes_through_its_code() {
		assert_eq!(Error::ENetwork(-113).to_errno(), -113);
	}
}
