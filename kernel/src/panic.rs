// SPDX-License-Identifier: GPL-2.0

//! Kernel panic bookkeeping.
//!
//! Disabling interrupts, walking the stack, and halting the CPU are
//! board-specific and out of scope here (spec.md §1) — those belong to the
//! `#[panic_handler]` of whatever freestanding image links this crate in.
//! What this module owns is spec.md §7's requirement: a kernel panic sets a
//! persistent flag that `KERNELPANICDETECT` reports after reboot. The
//! image's panic handler is expected to call [`record`] before it halts.

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

/// Set by [`record`], read back by `KERNELPANICDETECT` (spec.md §6).
///
/// Backed by an in-process atomic rather than anything actually persistent
/// across a power cycle — the persistence mechanism itself (battery-backed
/// RAM, a reserved flash sector, …) is board-specific and out of scope;
/// this is the contract boundary the board's reboot path is expected to
/// honor by not clearing it on a panic-triggered restart.
static PANIC_DETECTED: AtomicBool = AtomicBool::new(false);

/// Record that a kernel panic occurred, logging the location and message
/// through the ordinary logging path before the caller halts.
pub fn record(info: &PanicInfo) {
	PANIC_DETECTED.store(true, Ordering::SeqCst);

	if let Some(location) = info.location() {
		log::error!(
			"kernel panic at {}:{}:{}: {}",
			location.file(),
			location.line(),
			location.column(),
			info.message(),
		);
	} else {
		log::error!("kernel panic: {}", info.message());
	}
}

/// Backs the `KERNELPANICDETECT` syscall.
pub fn kernel_panic_detected() -> bool {
	PANIC_DETECTED.load(Ordering::SeqCst)
}

/// Clear the flag. Exposed for tests; a real reboot path has no use for it
/// since the whole point is that the flag survives the reboot.
#[cfg(test)]
pub fn clear_for_test() {
	PANIC_DETECTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kernel_panic_detected_is_false_until_a_panic_is_recorded() {
		clear_for_test();
		assert!(!kernel_panic_detected());

		// `PanicInfo` has no public constructor; route a real one through a
		// hook the way the board's `#[panic_handler]` would call `record`.
		let previous = std::panic::take_hook();
		std::panic::set_hook(Box::new(|info| record(info)));
		let result = std::panic::catch_unwind(|| {
			panic!("synthetic panic for the KERNELPANICDETECT test");
		});
		std::panic::set_hook(previous);

		assert!(result.is_err());
		assert!(kernel_panic_detected());
		clear_for_test();
	}
}
