//! Kernel diagnostic log: a `log::Log` implementation backed by the COM1
//! serial port (spec's ambient logging concern; not itself part of any
//! [MODULE]). Every subsystem logs through `log::info!`/`log::warn!`/
//! etc. instead of ad hoc `println!`, matching the teacher's split
//! between user-visible console output and the diagnostic log.

use log::{Level, LevelFilter, Metadata, Record};

struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::serial_println!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Installs the serial-backed logger as the global `log` facade.
///
/// # Safety
/// Must run once, before any other code calls into the `log` macros, and
/// after [`crate::serial::init`].
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Trace))
        .expect("logger must be installed exactly once");
}
