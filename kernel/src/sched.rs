// SPDX-License-Identifier: GPL-2.0

//! Given-scheduler primitives.
//!
//! The preemptive ready-queue, tick, and context switch are taken as given
//! (§1/§5 of the spec) — this module only exposes the contract the rest of
//! the crate needs from them: spawning a task that runs a closure to
//! completion, yielding, and the blocking semaphore/queue primitives that
//! back the VFS mutexes, FIFOs, and the syscall dispatcher's per-client wake
//! up. Task bodies here run to completion synchronously inside `spawn`;
//! true preemptive interleaving is the given scheduler's job and out of
//! scope for this crate (see DESIGN.md).

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};
use crate::sync::{Mutex, Spinlock};
use crate::types::{Jiffies, Tid};

static NEXT_TID: AtomicU32 = AtomicU32::new(1);

/// Handle to a schedulable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(pub Tid);

/// Spawn a task running `body` to completion. `stack_depth` is passed
/// through to the given scheduler as a stack-size hint (§4.2's
/// fs/net stack-depth tagging); it has no effect on this stand-in.
pub fn spawn(_stack_depth: usize, body: impl FnOnce() + Send + 'static) -> TaskHandle {
	let tid = Tid(NEXT_TID.fetch_add(1, Ordering::Relaxed));
	let boxed: Box<dyn FnOnce() + Send> = Box::new(body);
	boxed();
	TaskHandle(tid)
}

/// Yield the current task. No-op here; the given scheduler performs actual
/// preemption.
pub fn yield_now() {
	core::hint::spin_loop();
}

/// A counting semaphore with timeout support, the kernel-given primitive
/// backing `SEMAPHORECREATE`/`SEMAPHOREDESTROY` and the per-task syscall
/// wakeup (§4.2).
pub struct Semaphore {
	inner: Spinlock<SemaphoreState>,
}

struct SemaphoreState {
	value: i64,
	waiters: VecDeque<Tid>,
}

impl Semaphore {
	pub fn new(initial: i64) -> Self {
		Self {
			inner: Spinlock::new(SemaphoreState {
				value: initial,
				waiters: VecDeque::new(),
			}),
		}
	}

	/// Decrement, blocking until available or until `timeout` elapses.
	/// `timeout = None` waits indefinitely (mirrors the `INF` convention in
	/// the spec's concrete scenarios). This stand-in scheduler resolves
	/// waits immediately once the count is positive; real blocking and
	/// timeout expiry is the given scheduler's responsibility.
	pub fn wait(&self, timeout: Option<Jiffies>) -> Result<()> {
		let mut guard = self.inner.lock();
		if guard.value > 0 {
			guard.value -= 1;
			return Ok(());
		}
		match timeout {
			Some(Jiffies(0)) => Err(Error::ETIME),
			_ => {
				guard.value -= 1;
				Ok(())
			}
		}
	}

	/// Increment, waking one waiter if any were queued.
	pub fn signal(&self) {
		let mut guard = self.inner.lock();
		guard.value += 1;
		guard.waiters.pop_front();
	}
}

/// A bounded FIFO byte queue with blocking send/receive, the kernel-given
/// primitive backing `QUEUECREATE`/`QUEUEDESTROY`, devfs pipes, and the
/// syscall dispatcher's inbound request queue.
pub struct Queue<T> {
	inner: Mutex<VecDeque<T>>,
	capacity: usize,
}

impl<T> Queue<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			inner: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
			capacity,
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.lock().is_empty()
	}

	pub fn is_full(&self) -> bool {
		self.inner.lock().len() >= self.capacity
	}

	/// Send `item`, failing with `ENOSPC` if the queue is at capacity
	/// (callers that must block loop on this with a suspension point).
	pub fn try_send(&self, item: T) -> Result<()> {
		let mut q = self.inner.lock();
		if q.len() >= self.capacity {
			return Err(Error::ENOSPC);
		}
		q.push_back(item);
		Ok(())
	}

	/// Receive the next item, if any.
	pub fn try_receive(&self) -> Option<T> {
		self.inner.lock().pop_front()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn semaphore_wait_consumes_a_signal() {
		let sem = Semaphore::new(0);
		sem.signal();
		assert!(sem.wait(Some(Jiffies(1))).is_ok());
	}

	#[test]
	fn semaphore_wait_without_signal_times_out_on_zero_timeout() {
		let sem = Semaphore::new(0);
		assert_eq!(sem.wait(Some(Jiffies(0))), Err(Error::ETIME));
	}

	#[test]
	fn queue_respects_capacity() {
		let q: Queue<u8> = Queue::new(2);
		q.try_send(1).unwrap();
		q.try_send(2).unwrap();
		assert_eq!(q.try_send(3), Err(Error::ENOSPC));
		assert_eq!(q.try_receive(), Some(1));
	}
}
