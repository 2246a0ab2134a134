// SPDX-License-Identifier: GPL-2.0

//! Kernel logging, backed by the `log` facade crate.
//!
//! The teacher hand-rolled its own `info!`/`warn!`/`error!` macros around a
//! `LogEntry` formatter; here the same bracket/color/timestamp format backs
//! a `log::Log` implementation so the rest of the crate uses the standard
//! `log::{info,warn,error,debug,trace}!` macros instead.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::error::Result;
use crate::time::get_jiffies;

/// `SYSLOGENABLE`/`SYSLOGDISABLE` toggle this gate at runtime.
static LOG_ENABLED: AtomicBool = AtomicBool::new(true);

/// Enable log output. Backs the `SYSLOGENABLE` syscall.
pub fn enable() {
	LOG_ENABLED.store(true, Ordering::Relaxed);
}

/// Disable log output. Backs the `SYSLOGDISABLE` syscall.
pub fn disable() {
	LOG_ENABLED.store(false, Ordering::Relaxed);
}

fn level_color(level: Level) -> &'static str {
	match level {
		Level::Error => "\x1b[31m", // Red
		Level::Warn => "\x1b[33m",  // Yellow
		Level::Info => "\x1b[32m",  // Green
		Level::Debug => "\x1b[36m", // Cyan
		Level::Trace => "\x1b[37m", // White
	}
}

struct KernelLogger;

impl Log for KernelLogger {
	fn enabled(&self, _metadata: &Metadata) -> bool {
		LOG_ENABLED.load(Ordering::Relaxed)
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let pid = crate::process::current_pid().map(|p| p.0).unwrap_or(0);
		let color = level_color(record.level());

		crate::console::_print(format_args!(
			"{}[{:>5}] [{:>10}] pid={} {}: {}\x1b[0m\n",
			color,
			record.level(),
			get_jiffies().as_u64(),
			pid,
			record.target(),
			record.args(),
		));
	}

	fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Install the kernel logger as the global `log` backend. Must run exactly
/// once during early init.
pub fn init() -> Result<()> {
	log::set_logger(&LOGGER)
		.map(|()| log::set_max_level(LevelFilter::Trace))
		.ok();
	Ok(())
}
