// SPDX-License-Identifier: GPL-2.0

//! Compiled-in kernel tunables.
//!
//! The original sources scatter these as preprocessor constants
//! (`SYSCALL_QUEUE_LENGTH`, the devfs chain bucket size, …); here they are
//! collected into one struct so call sites don't carry magic numbers.

/// Compiled-in kernel tunables.
#[derive(Debug, Clone, Copy)]
pub struct Config {
	/// Depth of the kworker's inbound syscall request queue.
	pub syscall_queue_length: usize,
	/// Number of node slots per devfs chain bucket.
	pub devfs_bucket_size: usize,
	/// Byte capacity of a FIFO/pipe created by `mkfifo`.
	pub fifo_capacity: usize,
	/// Stack-depth hint for a group-1 (file-system) worker thread.
	pub fs_worker_stack_depth: usize,
	/// Stack-depth hint for a group-2 (network) worker thread.
	pub net_worker_stack_depth: usize,
	/// Maximum live process-table entries.
	pub max_processes: usize,
}

/// The crate-wide tunable set. There is exactly one instance; this is the
/// in-image equivalent of the out-of-scope configuration-tool metadata
/// files.
pub static CONFIG: Config = Config {
	syscall_queue_length: 8,
	devfs_bucket_size: 8,
	fifo_capacity: 128,
	fs_worker_stack_depth: 4096,
	net_worker_stack_depth: 8192,
	max_processes: 64,
};
