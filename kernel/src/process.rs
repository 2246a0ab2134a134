// SPDX-License-Identifier: GPL-2.0

//! Process, thread, and resource-table lifecycle (spec.md §4.1).
//!
//! Grounded on `original_source/src/system/include/kernel/process.h`'s
//! `process_t`/`thread_t` shape (pid, program-catalog entry, cwd, resource
//! list, exit semaphore/status, priority, stdio, thread list) and on the
//! teacher's `process.rs` for the general "global process table behind a
//! lock" pattern — the table itself is rewritten since the teacher's
//! `Process`/`Thread` carried Linux `task_struct` fields (`memory_map`,
//! `context: Context`, signals) that have no counterpart once CPU
//! context-switching is taken as given (spec.md §1).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::catalog::{self, ProgramEntry};
use crate::error::{Error, Result};
use crate::resource::{Resource, ResourceId, ResourceKind, ResourceList};
use crate::sched::{self, Semaphore, TaskHandle};
use crate::sync::Spinlock;
use crate::types::{Pid, Tid};
use crate::vfs::{OpenFlags, VFS};

static NEXT_PID: AtomicU32 = AtomicU32::new(1);

fn allocate_pid() -> Pid {
	Pid(NEXT_PID.fetch_add(1, Ordering::SeqCst))
}

/// `NEW → RUNNING → ZOMBIE → REAPED` (spec.md §4.1). `NEW` is folded into
/// process construction — by the time a `Process` is registered in the
/// table it is already `RUNNING` (the given scheduler has no separate
/// "not yet scheduled" window this crate observes). `REAPED` is likewise
/// implicit: it is the moment the table entry is removed, not a state a
/// live `Process` can be observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
	Running,
	Zombie,
}

/// Which stdio slot is being set up; used only to index `stdio_paths`.
#[derive(Clone, Copy)]
enum StdioSlot {
	In = 0,
	Out = 1,
	Err = 2,
}

/// How a new process's stdin/stdout/stderr are set up (spec.md §4.1 —
/// "opens stdin/stdout/stderr per attrs, either by inheriting file
/// pointers or by opening named paths").
#[derive(Clone)]
pub enum StdioSpec {
	/// No stream is opened; the slot stays empty.
	None,
	/// Re-open the parent's recorded path/flags for this stream. There is
	/// no `dup`-equivalent primitive in this contract, so "inheriting" is
	/// approximated by re-opening the same path under the parent's
	/// original flags rather than literally sharing the parent's open
	/// file resource — documented in DESIGN.md as an engineering
	/// simplification, not a strict open question.
	Inherit,
	/// Open this path fresh under the given raw `O_*` flag bits.
	Path(String, u32),
}

impl Default for StdioSpec {
	fn default() -> Self {
		StdioSpec::None
	}
}

/// Attributes accepted by `process_create` (spec.md §4.1).
#[derive(Clone)]
pub struct ProcessAttrs {
	pub parent: Option<Pid>,
	pub has_parent: bool,
	pub priority: i32,
	pub cwd: Option<String>,
	pub stdin: StdioSpec,
	pub stdout: StdioSpec,
	pub stderr: StdioSpec,
	/// Exempts a process from `PROCESSCREATE`'s top-process OOM reaping
	/// (spec.md §4.2's "top process": "most recently started
	/// **non-essential** process"). The kworker process is essential.
	pub essential: bool,
}

impl Default for ProcessAttrs {
	fn default() -> Self {
		Self {
			parent: None,
			has_parent: false,
			priority: 0,
			cwd: None,
			stdin: StdioSpec::None,
			stdout: StdioSpec::None,
			stderr: StdioSpec::None,
			essential: false,
		}
	}
}

/// A joinable/detached subordinate schedulable entity of a process
/// (spec.md §3 "Thread").
pub struct Thread {
	pub tid: Tid,
	pub task: TaskHandle,
	pub detached: bool,
	pub exit_sem: Arc<Semaphore>,
}

/// Process-stat record consumed by `PROCESSSTATSEEK`/`PROCESSSTATPID`
/// (SPEC_FULL.md §3, grounded in `process.h`'s `process_stat_t`).
#[derive(Debug, Clone)]
pub struct ProcessStat {
	pub pid: Pid,
	pub name: String,
	pub priority: i32,
	pub memory_bytes: usize,
	pub thread_count: usize,
	pub zombie: bool,
}

/// A live (or zombie) process record. Attribute set matches spec.md §3.
pub struct Process {
	pub pid: Pid,
	pub parent: Option<Pid>,
	pub has_parent: bool,
	pub priority: i32,
	pub essential: bool,
	program: ProgramEntry,
	argv: Vec<String>,
	globals: Spinlock<Box<[u8]>>,
	cwd: Spinlock<String>,
	resources: Spinlock<ResourceList>,
	threads: Spinlock<Vec<Thread>>,
	stdin: Spinlock<Option<ResourceId>>,
	stdout: Spinlock<Option<ResourceId>>,
	stderr: Spinlock<Option<ResourceId>>,
	stdio_paths: Spinlock<[Option<(String, u32)>; 3]>,
	pub exit_sem: Arc<Semaphore>,
	state: Spinlock<ProcessState>,
	exit_status: Spinlock<i32>,
	torn_down: Spinlock<bool>,
}

/// Allocate `len` zeroed bytes, reporting `ENOMEM` instead of aborting on
/// allocation failure (spec.md §4.1 — "any allocation failure along the
/// create path ... returns an error to the caller").
fn alloc_zeroed(len: usize) -> Result<Box<[u8]>> {
	let mut v: Vec<u8> = Vec::new();
	v.try_reserve_exact(len).map_err(|_| Error::ENOMEM)?;
	v.resize(len, 0);
	Ok(v.into_boxed_slice())
}

impl Process {
	pub fn cwd(&self) -> String {
		self.cwd.lock().clone()
	}

	pub fn set_cwd(&self, path: String) {
		*self.cwd.lock() = path;
	}

	pub fn argv(&self) -> &[String] {
		&self.argv
	}

	pub fn globals(&self) -> Box<[u8]> {
		self.globals.lock().clone()
	}

	pub fn name(&self) -> &str {
		&self.program.name
	}

	pub fn state(&self) -> ProcessState {
		*self.state.lock()
	}

	/// O(1) prepend into this process's resource list (spec.md §4.1).
	pub fn register_resource(&self, resource: Resource) -> Result<ResourceId> {
		Ok(self.resources.lock().register(resource))
	}

	/// Invariant R1: a type mismatch is `EFAULT`, fatal to the caller.
	pub fn release_resource(&self, id: ResourceId, expected: ResourceKind) -> Result<Resource> {
		self.resources.lock().release(id, expected)
	}

	/// Run `f` against the resource tagged `id` in place, for syscalls that
	/// operate repeatedly against a still-open handle.
	pub fn with_resource<R>(
		&self,
		id: ResourceId,
		expected: ResourceKind,
		f: impl FnOnce(&mut Resource) -> Result<R>,
	) -> Result<R> {
		let mut resources = self.resources.lock();
		let resource = resources.get_mut(id, expected)?;
		f(resource)
	}

	fn destroy_resource(resource: Resource) {
		match resource {
			Resource::File(file) => {
				let _ = VFS.fclose(file);
			}
			Resource::Dir(dir) => {
				let _ = VFS.closedir(dir);
			}
			Resource::Mutex(_) | Resource::Sem(_) | Resource::Queue(_) | Resource::Socket(_) => {}
			Resource::Memory(_) => {}
			Resource::Thread(_task) => {
				// The given scheduler's task has already run to completion
				// (spec.md §1/§5); nothing further to cancel in this
				// crate's stand-in.
			}
		}
	}

	/// Best-effort write to this process's recorded stderr stream, used by
	/// the dispatcher's OOM-reaping path to mirror
	/// `original_source`'s `destroy_top_process` writing "out of memory"
	/// to the victim (SPEC_FULL.md §7). Failure here is swallowed: a
	/// process about to be destroyed for being out of memory may well
	/// fail this write too.
	fn write_stderr(&self, msg: &str) {
		let id = match *self.stderr.lock() {
			Some(id) => id,
			None => return,
		};
		let mut resources = self.resources.lock();
		if let Ok(Resource::File(mut file)) = resources.release(id, ResourceKind::File) {
			drop(resources);
			let _ = VFS.fwrite(&mut file, msg.as_bytes());
			let new_id = self.resources.lock().register(Resource::File(file));
			*self.stderr.lock() = Some(new_id);
		}
	}

	/// Release every registered resource (Invariant R2), join every
	/// still-tracked thread, and signal the exit semaphore. Idempotent —
	/// a process that is force-destroyed after already self-exiting is a
	/// no-op here.
	fn teardown(&self, status: i32) {
		let mut torn_down = self.torn_down.lock();
		if *torn_down {
			return;
		}
		*torn_down = true;
		drop(torn_down);

		*self.exit_status.lock() = status;

		for thread in self.threads.lock().drain(..) {
			let _ = thread.exit_sem.wait(Some(crate::types::Jiffies(0)));
		}

		let drained = self.resources.lock().drain_all();
		for resource in drained {
			Self::destroy_resource(resource);
		}

		self.exit_sem.signal();
	}
}

/// Global process table (spec.md §9 — "module-level singleton with
/// explicit init/teardown entry points").
pub struct ProcessTable {
	processes: Spinlock<BTreeMap<Pid, Arc<Process>>>,
}

impl ProcessTable {
	pub const fn new() -> Self {
		Self {
			processes: Spinlock::new(BTreeMap::new()),
		}
	}

	pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
		self.processes.lock().get(&pid).cloned()
	}

	pub fn count(&self) -> usize {
		self.processes.lock().len()
	}

	/// Most recently started (highest pid) `Running`, non-essential
	/// process — the "top process" of spec.md §4.2's OOM reaping,
	/// optionally excluding one pid (the client whose own request
	/// triggered the reap).
	pub fn top_process(&self, exclude: Option<Pid>) -> Option<Arc<Process>> {
		self.processes
			.lock()
			.values()
			.filter(|p| !p.essential && p.state() == ProcessState::Running && Some(p.pid) != exclude)
			.max_by_key(|p| p.pid.0)
			.cloned()
	}

	fn stat_of(p: &Process) -> ProcessStat {
		ProcessStat {
			pid: p.pid,
			name: p.name().to_string(),
			priority: p.priority,
			memory_bytes: p.globals.lock().len(),
			thread_count: p.threads.lock().len(),
			zombie: p.state() == ProcessState::Zombie,
		}
	}

	pub fn stat_by_pid(&self, pid: Pid) -> Result<ProcessStat> {
		let table = self.processes.lock();
		let p = table.get(&pid).ok_or(Error::ESRCH)?;
		Ok(Self::stat_of(p))
	}

	/// `PROCESSSTATSEEK`: 0-based index into the current live-process
	/// snapshot, ordered by pid.
	pub fn stat_seek(&self, index: usize) -> Option<ProcessStat> {
		let table = self.processes.lock();
		table.values().nth(index).map(|p| Self::stat_of(p))
	}
}

/// The crate-wide process table.
pub static PROCESS_TABLE: ProcessTable = ProcessTable::new();

/// Parse a command line into argv, UNIX-`sh`-style whitespace splitting
/// (no quoting support — out of scope for this kernel-internal contract).
fn parse_cmd(cmd: &str) -> Result<Vec<String>> {
	let argv: Vec<String> = cmd.split_whitespace().map(|s| s.to_string()).collect();
	if argv.is_empty() {
		return Err(Error::EINVAL);
	}
	Ok(argv)
}

fn setup_stdio_slot(
	process: &Process,
	slot: StdioSlot,
	spec: &StdioSpec,
	cwd: &str,
	parent: Option<&Arc<Process>>,
) -> Result<()> {
	let resolved: Option<(String, u32)> = match spec {
		StdioSpec::None => None,
		StdioSpec::Path(path, flags) => Some((path.clone(), *flags)),
		StdioSpec::Inherit => parent.and_then(|pp| pp.stdio_paths.lock()[slot as usize].clone()),
	};

	let (path, raw_flags) = match resolved {
		Some(v) => v,
		None => return Ok(()),
	};

	let abs = crate::vfs::path::resolve(cwd, &path);
	let file = VFS.fopen(&abs, OpenFlags::from_bits(raw_flags), 0o644)?;
	let id = process.resources.lock().register(Resource::File(file));

	match slot {
		StdioSlot::In => *process.stdin.lock() = Some(id),
		StdioSlot::Out => *process.stdout.lock() = Some(id),
		StdioSlot::Err => *process.stderr.lock() = Some(id),
	}
	process.stdio_paths.lock()[slot as usize] = Some((path, raw_flags));
	Ok(())
}

/// `process_create` (spec.md §4.1).
pub fn process_create(cmd: &str, attrs: ProcessAttrs) -> Result<Pid> {
	let argv = parse_cmd(cmd)?;
	let program = catalog::lookup(&argv[0]).ok_or(Error::ENOENT)?;

	let globals = alloc_zeroed(program.globals_size)?;
	let pid = allocate_pid();
	let cwd = attrs.cwd.clone().unwrap_or_else(|| "/".to_string());

	let process = Arc::new(Process {
		pid,
		parent: attrs.parent,
		has_parent: attrs.has_parent,
		priority: attrs.priority,
		essential: attrs.essential,
		program: program.clone(),
		argv,
		globals: Spinlock::new(globals),
		cwd: Spinlock::new(cwd.clone()),
		resources: Spinlock::new(ResourceList::new()),
		threads: Spinlock::new(Vec::new()),
		stdin: Spinlock::new(None),
		stdout: Spinlock::new(None),
		stderr: Spinlock::new(None),
		stdio_paths: Spinlock::new([None, None, None]),
		exit_sem: Arc::new(Semaphore::new(0)),
		state: Spinlock::new(ProcessState::Running),
		exit_status: Spinlock::new(0),
		torn_down: Spinlock::new(false),
	});

	let parent_proc = attrs.parent.and_then(|p| PROCESS_TABLE.get(p));
	setup_stdio_slot(&process, StdioSlot::In, &attrs.stdin, &cwd, parent_proc.as_ref())?;
	setup_stdio_slot(&process, StdioSlot::Out, &attrs.stdout, &cwd, parent_proc.as_ref())?;
	setup_stdio_slot(&process, StdioSlot::Err, &attrs.stderr, &cwd, parent_proc.as_ref())?;

	PROCESS_TABLE.processes.lock().insert(pid, process.clone());

	let argv_for_main = process.argv().to_vec();
	let main = program.main;
	let proc_for_exit = process.clone();
	let _task = sched::spawn(program.stack_depth, move || {
		let status = main(argv_for_main.len() as i32, &argv_for_main);
		process_exit_inner(&proc_for_exit, status);
	});

	Ok(pid)
}

fn process_exit_inner(process: &Arc<Process>, status: i32) {
	process.teardown(status);
	if process.has_parent {
		*process.state.lock() = ProcessState::Zombie;
	} else {
		PROCESS_TABLE.processes.lock().remove(&process.pid);
	}
}

/// `process_exit`: internal self-termination path, invoked by the `EXIT`
/// syscall handler and by a program's `main` returning (spec.md §4.1's
/// `RUNNING → ZOMBIE`/`RUNNING → REAPED` transitions).
pub fn process_exit(pid: Pid, status: i32) -> Result<()> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	process_exit_inner(&process, status);
	Ok(())
}

/// `process_abort`: equivalent to `process_exit(pid, -1)` (spec.md §4.1).
pub fn process_abort(pid: Pid) -> Result<()> {
	process_exit(pid, -1)
}

/// `process_destroy(pid)` (spec.md §4.1): the parent-facing reap call.
/// Tearing down is idempotent, so calling this against a process that has
/// not yet self-exited (the OOM-reaping path, spec.md §4.2) forces the
/// same teardown before freeing the slot.
pub fn process_destroy(pid: Pid) -> Result<i32> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	process.teardown(-1);
	let status = *process.exit_status.lock();
	PROCESS_TABLE.processes.lock().remove(&pid);
	Ok(status)
}

/// `process_get_exit_sem` (spec.md §4.1).
pub fn process_get_exit_sem(pid: Pid) -> Result<Arc<Semaphore>> {
	Ok(PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.exit_sem.clone())
}

/// `process_register_resource` (spec.md §4.1).
pub fn process_register_resource(pid: Pid, resource: Resource) -> Result<ResourceId> {
	PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.register_resource(resource)
}

/// `process_release_resource` (spec.md §4.1). `Err(Error::EFAULT)` here is
/// the dispatcher's cue to abort the offending process (spec.md §4.2).
pub fn process_release_resource(pid: Pid, id: ResourceId, expected: ResourceKind) -> Result<Resource> {
	PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.release_resource(id, expected)
}

/// Run `f` against a still-registered resource of `pid` in place (used by
/// the syscall dispatcher's repeated-operation handlers: `fread`/`fwrite`/
/// `fseek`/`ioctl`/`fflush` and their mutex/semaphore/queue equivalents).
pub fn with_resource<R>(
	pid: Pid,
	id: ResourceId,
	expected: ResourceKind,
	f: impl FnOnce(&mut Resource) -> Result<R>,
) -> Result<R> {
	PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.with_resource(id, expected, f)
}

/// `process_thread_create` (spec.md §4.1): spawns a scheduler task whose
/// entry wraps `body`, registers it as a `THREAD` resource of `pid`, and on
/// return signals the thread's exit semaphore, self-releasing if detached.
pub fn process_thread_create(
	pid: Pid,
	stack_depth: usize,
	detached: bool,
	body: Box<dyn FnOnce() + Send>,
) -> Result<Tid> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	static NEXT_TID: AtomicU32 = AtomicU32::new(1);
	let tid = Tid(NEXT_TID.fetch_add(1, Ordering::SeqCst));
	let exit_sem = Arc::new(Semaphore::new(0));

	let task = sched::spawn(stack_depth, {
		let exit_sem = exit_sem.clone();
		move || {
			body();
			exit_sem.signal();
		}
	});

	let id = process.register_resource(Resource::Thread(task))?;
	process.threads.lock().push(Thread {
		tid,
		task,
		detached,
		exit_sem: exit_sem.clone(),
	});

	if detached {
		let _ = process.release_resource(id, ResourceKind::Thread);
	}

	Ok(tid)
}

/// `process_thread_get_exit_sem` (spec.md §4.1): the canonical join
/// interface.
pub fn process_thread_get_exit_sem(pid: Pid, tid: Tid) -> Result<Arc<Semaphore>> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	let threads = process.threads.lock();
	threads
		.iter()
		.find(|t| t.tid == tid)
		.map(|t| t.exit_sem.clone())
		.ok_or(Error::ESRCH)
}

/// `process_thread_exit`: signals the calling thread's own exit semaphore.
pub fn process_thread_exit(pid: Pid, tid: Tid) -> Result<()> {
	let sem = process_thread_get_exit_sem(pid, tid)?;
	sem.signal();
	Ok(())
}

/// `THREADDESTROY` (SPEC_FULL.md §6): forcibly drop a thread's bookkeeping
/// entry ahead of its natural exit. Since the given scheduler's tasks here
/// run synchronously to completion before `process_thread_create` returns
/// (`sched::spawn`'s documented stand-in), by the time this is callable the
/// thread has already finished; this removes its tracking entry so
/// `process_destroy` does not wait on it a second time.
pub fn process_thread_destroy(pid: Pid, tid: Tid) -> Result<()> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	let mut threads = process.threads.lock();
	let pos = threads.iter().position(|t| t.tid == tid).ok_or(Error::ESRCH)?;
	threads.remove(pos);
	Ok(())
}

pub fn getcwd(pid: Pid) -> Result<String> {
	Ok(PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.cwd())
}

pub fn setcwd(pid: Pid, path: String) -> Result<()> {
	PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.set_cwd(path);
	Ok(())
}

pub fn get_priority(pid: Pid) -> Result<i32> {
	Ok(PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?.priority)
}

pub fn stat_by_pid(pid: Pid) -> Result<ProcessStat> {
	PROCESS_TABLE.stat_by_pid(pid)
}

pub fn stat_seek(index: usize) -> Option<ProcessStat> {
	PROCESS_TABLE.stat_seek(index)
}

pub fn count() -> usize {
	PROCESS_TABLE.count()
}

/// Top-process OOM reaping (spec.md §4.2): writes `msg` to the victim's
/// stderr, signals its exit semaphore, and destroys it. Returns the exit
/// status `process_destroy` observed.
pub fn oom_kill(pid: Pid, msg: &str) -> Result<i32> {
	let process = PROCESS_TABLE.get(pid).ok_or(Error::ESRCH)?;
	process.write_stderr(msg);
	process_destroy(pid)
}

/// Most recently started `Running`, non-essential process (spec.md §4.2's
/// "top process"), for the dispatcher's OOM-reaping path.
pub fn top_process() -> Option<Pid> {
	PROCESS_TABLE.top_process(None).map(|p| p.pid)
}

/// Process the dispatcher is currently running a handler on behalf of.
/// Set by the syscall dispatcher around each handler invocation; read by
/// the logger for the `pid=` field in every log line (SPEC_FULL.md §4.6).
static CURRENT_PID: Spinlock<Option<Pid>> = Spinlock::new(None);

pub fn set_current_pid(pid: Option<Pid>) {
	*CURRENT_PID.lock() = pid;
}

pub fn current_pid() -> Option<Pid> {
	*CURRENT_PID.lock()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::string::ToString;

	fn noop_main(_argc: i32, _argv: &[String]) -> i32 {
		0
	}

	fn returns_seven(_argc: i32, _argv: &[String]) -> i32 {
		7
	}

	fn register_test_programs() {
		catalog::clear_for_test();
		catalog::register(ProgramEntry {
			name: "noop".to_string(),
			main: noop_main,
			globals_size: 0,
			stack_depth: 4096,
		});
		catalog::register(ProgramEntry {
			name: "child".to_string(),
			main: returns_seven,
			globals_size: 16,
			stack_depth: 4096,
		});
	}

	#[test]
	fn create_unknown_program_is_enoent() {
		catalog::clear_for_test();
		assert_eq!(
			process_create("nonexistent", ProcessAttrs::default()),
			Err(Error::ENOENT)
		);
	}

	#[test]
	fn create_empty_command_is_einval() {
		register_test_programs();
		assert_eq!(process_create("", ProcessAttrs::default()), Err(Error::EINVAL));
	}

	#[test]
	fn exit_propagates_through_semaphore_and_destroy_returns_status() {
		register_test_programs();
		let attrs = ProcessAttrs {
			has_parent: true,
			..Default::default()
		};
		let pid = process_create("child", attrs).unwrap();
		let sem = process_get_exit_sem(pid).unwrap();
		sem.wait(None).unwrap();
		let status = process_destroy(pid).unwrap();
		assert_eq!(status, 7);
	}

	#[test]
	fn process_without_parent_is_auto_reaped() {
		register_test_programs();
		let pid = process_create("noop", ProcessAttrs::default()).unwrap();
		assert!(PROCESS_TABLE.get(pid).is_none());
	}

	#[test]
	fn release_resource_with_wrong_type_is_efault() {
		register_test_programs();
		let attrs = ProcessAttrs {
			has_parent: true,
			..Default::default()
		};
		let pid = process_create("child", attrs).unwrap();
		let id = process_register_resource(pid, Resource::Sem(Arc::new(Semaphore::new(0)))).unwrap();
		assert_eq!(
			process_release_resource(pid, id, ResourceKind::Mutex),
			Err(Error::EFAULT)
		);
		process_destroy(pid).unwrap();
	}

	#[test]
	fn stat_seek_reports_every_live_process() {
		register_test_programs();
		let attrs = ProcessAttrs {
			has_parent: true,
			..Default::default()
		};
		let pid = process_create("child", attrs).unwrap();
		let stat = stat_by_pid(pid).unwrap();
		assert_eq!(stat.name, "child");
		assert!(stat.zombie);
		process_destroy(pid).unwrap();
	}

	#[test]
	fn top_process_excludes_essential_processes() {
		register_test_programs();
		let mut attrs = ProcessAttrs {
			has_parent: true,
			essential: true,
			..Default::default()
		};
		let essential_pid = process_create("child", attrs.clone()).unwrap();
		attrs.essential = false;
		let normal_pid = process_create("child", attrs).unwrap();

		let top = PROCESS_TABLE.top_process(None).unwrap();
		assert_eq!(top.pid, normal_pid);

		process_destroy(essential_pid).unwrap();
		process_destroy(normal_pid).unwrap();
	}
}
