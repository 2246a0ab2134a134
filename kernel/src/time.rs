// SPDX-License-Identifier: GPL-2.0

//! Minimal time surface. Clock/PLL programming and hardware RTC access are
//! out of scope (§1); the given preemptive scheduler is assumed to tick
//! `JIFFIES_COUNTER` once per scheduling quantum. This module only exposes
//! the query/set surface the syscall layer needs (`GETTIME`/`SETTIME`).

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::types::Jiffies;

/// Nanoseconds per second.
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

static JIFFIES_COUNTER: AtomicU64 = AtomicU64::new(0);
static REALTIME_OFFSET_NS: AtomicU64 = AtomicU64::new(0);

/// Wall-clock time, Linux `timespec`-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpec {
	pub tv_sec: i64,
	pub tv_nsec: i64,
}

impl TimeSpec {
	pub const fn new(sec: i64, nsec: i64) -> Self {
		Self {
			tv_sec: sec,
			tv_nsec: nsec,
		}
	}

	pub fn to_ns(&self) -> u64 {
		(self.tv_sec as u64 * NSEC_PER_SEC) + self.tv_nsec as u64
	}

	pub fn from_ns(ns: u64) -> Self {
		Self::new((ns / NSEC_PER_SEC) as i64, (ns % NSEC_PER_SEC) as i64)
	}
}

/// Called by the given scheduler once per tick. Not part of the syscall
/// surface.
pub fn tick() {
	JIFFIES_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// Current tick count.
pub fn get_jiffies() -> Jiffies {
	Jiffies(JIFFIES_COUNTER.load(Ordering::Relaxed))
}

/// Backs the `GETTIME` syscall.
pub fn get_time() -> TimeSpec {
	let offset = REALTIME_OFFSET_NS.load(Ordering::Relaxed);
	TimeSpec::from_ns(offset + get_jiffies().as_u64())
}

/// Backs the `SETTIME` syscall.
pub fn set_time(t: TimeSpec) -> Result<()> {
	let now_jiffies_ns = get_jiffies().as_u64();
	REALTIME_OFFSET_NS.store(t.to_ns().saturating_sub(now_jiffies_ns), Ordering::Relaxed);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timespec_ns_round_trip() {
		let t = TimeSpec::new(5, 250);
		assert_eq!(TimeSpec::from_ns(t.to_ns()), t);
	}

	#[test]
	fn set_time_then_get_time_is_monotone_from_offset() {
		set_time(TimeSpec::new(1000, 0)).unwrap();
		let t = get_time();
		assert!(t.tv_sec >= 1000);
	}
}
