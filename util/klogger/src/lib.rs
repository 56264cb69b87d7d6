// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! The kernel's `log` backend.
//!
//! Records are printed as `[time path:line] message` with the message
//! colored by level. With the `std` feature output goes to standard output
//! stamped with the local time; otherwise the embedding kernel supplies the
//! sink and the clock through [`LoggerAdapter`].
#![cfg_attr(not(any(test, feature = "std")), no_std)]

use core::{
    fmt::{self, Write},
    str::FromStr,
};

#[cfg(not(feature = "std"))]
use crate_interface::call_interface;
use log::{Level, LevelFilter, Log, Metadata, ParseLevelError, Record};
pub use log::{debug, error, info, trace, warn};

#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        let _ = $crate::print_fmt(format_args!($($arg)*));
    }
}

#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\n") };
    ($($arg:tt)*) => {
        let _ = $crate::print_fmt(format_args!("{}\n", format_args!($($arg)*)));
    }
}

macro_rules! color_fmt {
    ($color_code:expr, $($arg:tt)*) => {
        format_args!("\u{1B}[{}m{}\u{1B}[m", $color_code as u8, format_args!($($arg)*))
    };
}

#[repr(u8)]
enum AnsiColor {
    Red         = 31,
    Green       = 32,
    Yellow      = 33,
    Cyan        = 36,
    White       = 37,
    BrightBlack = 90,
}

impl AnsiColor {
    fn for_level(level: Level) -> Self {
        match level {
            Level::Error => Self::Red,
            Level::Warn => Self::Yellow,
            Level::Info => Self::Green,
            Level::Debug => Self::Cyan,
            Level::Trace => Self::BrightBlack,
        }
    }
}

/// Services the embedding kernel provides to the logger when it is built
/// without `std`.
#[crate_interface::def_interface]
pub trait LoggerAdapter {
    /// Writes a piece of formatted output to the console.
    fn write_str(s: &str);
    /// Time since boot.
    fn now() -> core::time::Duration;
    /// ID of the thread issuing the record, if there is one.
    fn task_id() -> Option<u64>;
}

struct KernelLogger;

impl Write for KernelLogger {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        cfg_if::cfg_if! {
            if #[cfg(feature = "std")] {
                std::print!("{s}");
            } else {
                call_interface!(LoggerAdapter::write_str, s);
            }
        }
        Ok(())
    }
}

impl Log for KernelLogger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = record.line().unwrap_or(0);
        let path = record.target();
        let color = AnsiColor::for_level(record.level());

        cfg_if::cfg_if! {
            if #[cfg(feature = "std")] {
                let _ = print_fmt(color_fmt!(
                    AnsiColor::White,
                    "[{time} {path}:{line}] {args}\n",
                    time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
                    args = color_fmt!(color, "{}", record.args()),
                ));
            } else {
                let now = call_interface!(LoggerAdapter::now);
                let _ = match call_interface!(LoggerAdapter::task_id) {
                    Some(tid) => print_fmt(color_fmt!(
                        AnsiColor::White,
                        "[{:>3}.{:06} {tid} {path}:{line}] {args}\n",
                        now.as_secs(),
                        now.subsec_micros(),
                        args = color_fmt!(color, "{}", record.args()),
                    )),
                    None => print_fmt(color_fmt!(
                        AnsiColor::White,
                        "[{:>3}.{:06} {path}:{line}] {args}\n",
                        now.as_secs(),
                        now.subsec_micros(),
                        args = color_fmt!(color, "{}", record.args()),
                    )),
                };
            }
        }
    }

    fn flush(&self) {}
}

/// Prints formatted output, serialized against concurrent log records.
pub fn print_fmt(args: fmt::Arguments) -> fmt::Result {
    static LOCK: spin::Mutex<()> = spin::Mutex::new(());

    let _guard = LOCK.lock();
    KernelLogger.write_fmt(args)
}

/// Installs the logger at level `warn`.
///
/// Returns `false` if a logger was already installed, in which case only
/// the level is reset.
pub fn init_klogger() -> bool {
    let installed = log::set_logger(&KernelLogger).is_ok();
    log::set_max_level(LevelFilter::Warn);
    installed
}

/// Sets the maximum level from its name (`"off"`, `"error"`, …, `"trace"`,
/// case-insensitive). An unknown name leaves the level unchanged.
pub fn set_log_level(level: &str) -> Result<LevelFilter, ParseLevelError> {
    let filter = LevelFilter::from_str(level.trim())?;
    log::set_max_level(filter);
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "std"))]
    struct StdoutAdapter;

    #[cfg(not(feature = "std"))]
    #[crate_interface::impl_interface]
    impl LoggerAdapter for StdoutAdapter {
        fn write_str(s: &str) {
            std::print!("{s}");
        }

        fn now() -> core::time::Duration {
            core::time::Duration::ZERO
        }

        fn task_id() -> Option<u64> {
            None
        }
    }

    // Levels are process-wide, so they are checked in a single test.
    #[test]
    fn test_init_and_levels() {
        init_klogger();
        assert!(!init_klogger());
        assert_eq!(log::max_level(), LevelFilter::Warn);
        info!("filtered out");

        assert_eq!(set_log_level("debug"), Ok(LevelFilter::Debug));
        assert_eq!(log::max_level(), LevelFilter::Debug);
        assert_eq!(set_log_level(" TRACE "), Ok(LevelFilter::Trace));
        assert!(set_log_level("verbose").is_err());
        assert_eq!(log::max_level(), LevelFilter::Trace);
        debug!("printed at trace level");
        kprintln!("kprintln works after init");
    }

    #[test]
    fn test_color_for_level() {
        assert_eq!(AnsiColor::for_level(Level::Error) as u8, 31);
        assert_eq!(AnsiColor::for_level(Level::Trace) as u8, 90);
    }
}
