// SPDX-License-Identifier: GPL-2.0

//! Static program catalog.
//!
//! Grounded in `original_source/src/system/include/kernel/process.h`'s
//! `_prog_table`/`_PROGRAM_CONFIG`: a fixed table of `{name, main,
//! globals_size, stack_depth}` entries that `process_create`'s argv[0] is
//! looked up against. Programs are linked in and registered once at image
//! build time there; here a program registers itself by calling
//! [`register`] during crate/test setup, since this crate has no linker-
//! section trick to enumerate them automatically.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::sync::Mutex;

/// KERNELSPACE program entry point: `main(argc, argv) -> exit code`.
pub type ProcessMain = fn(i32, &[String]) -> i32;

/// One catalog entry — the Rust-native equivalent of a `_prog_data` row.
#[derive(Clone)]
pub struct ProgramEntry {
	pub name: String,
	pub main: ProcessMain,
	pub globals_size: usize,
	pub stack_depth: usize,
}

static CATALOG: Mutex<Vec<ProgramEntry>> = Mutex::new(Vec::new());

/// Register a program under `name`. Re-registering the same name replaces
/// the previous entry (there is no "linked once" guarantee to enforce here).
pub fn register(entry: ProgramEntry) {
	let mut catalog = CATALOG.lock();
	if let Some(existing) = catalog.iter_mut().find(|e| e.name == entry.name) {
		*existing = entry;
	} else {
		catalog.push(entry);
	}
}

/// Look up a program by name (argv[0]).
pub fn lookup(name: &str) -> Option<ProgramEntry> {
	CATALOG.lock().iter().find(|e| e.name == name).cloned()
}

/// Number of programs currently registered.
pub fn len() -> usize {
	CATALOG.lock().len()
}

#[cfg(test)]
pub(crate) fn clear_for_test() {
	CATALOG.lock().clear();
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop_main(_argc: i32, _argv: &[String]) -> i32 {
		0
	}

	#[test]
	fn register_then_lookup_round_trips() {
		clear_for_test();
		register(ProgramEntry {
			name: "hello".to_string(),
			main: noop_main,
			globals_size: 0,
			stack_depth: 4096,
		});
		let entry = lookup("hello").unwrap();
		assert_eq!(entry.name, "hello");
		assert_eq!((entry.main)(0, &[]), 0);
	}

	#[test]
	fn lookup_of_unknown_program_is_none() {
		clear_for_test();
		assert!(lookup("nonexistent").is_none());
	}

	#[test]
	fn re_registering_same_name_replaces_entry() {
		clear_for_test();
		register(ProgramEntry {
			name: "dup".to_string(),
			main: noop_main,
			globals_size: 0,
			stack_depth: 1,
		});
		register(ProgramEntry {
			name: "dup".to_string(),
			main: noop_main,
			globals_size: 0,
			stack_depth: 2,
		});
		assert_eq!(len(), 1);
		assert_eq!(lookup("dup").unwrap().stack_depth, 2);
	}
}
