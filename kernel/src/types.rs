// SPDX-License-Identifier: GPL-2.0

//! Common kernel types

use core::fmt;
use core::ops::{Add, Mul, Sub};

/// Process ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Thread ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// User ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Uid(pub u32);

/// Group ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Gid(pub u32);

/// Kernel tick counter, incremented by the given preemptive scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Jiffies(pub u64);

impl Jiffies {
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl Mul<u64> for Jiffies {
	type Output = u64;

	fn mul(self, rhs: u64) -> Self::Output {
		self.0 * rhs
	}
}

impl Add<u64> for Jiffies {
	type Output = Jiffies;

	fn add(self, rhs: u64) -> Self::Output {
		Jiffies(self.0 + rhs)
	}
}

impl Sub<Jiffies> for Jiffies {
	type Output = Jiffies;

	fn sub(self, rhs: Jiffies) -> Self::Output {
		Jiffies(self.0.saturating_sub(rhs.0))
	}
}

/// Device identifier, packed as `(major << 8) | minor` to match the stat
/// `st_dev` encoding devfs nodes report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u32);

impl DeviceId {
	pub const fn new(major: u8, minor: u8) -> Self {
		Self(((major as u32) << 8) | minor as u32)
	}

	pub const fn major(self) -> u8 {
		(self.0 >> 8) as u8
	}

	pub const fn minor(self) -> u8 {
		self.0 as u8
	}
}

impl fmt::Display for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.major(), self.minor())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn device_id_packs_major_minor() {
		let d = DeviceId::new(4, 7);
		assert_eq!(d.major(), 4);
		assert_eq!(d.minor(), 7);
	}
}
