//! Log records go to syslog, and to stderr as well while running in the
//! foreground.

use std::ffi::CString;

use anyhow::Context;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::cli::Verbosity;

/// syslog identity of the daemon.
pub(crate) const IDENT: &str = "ofconfig-server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Destinations {
    pub(crate) syslog: bool,
    pub(crate) terminal: bool,
}

impl Destinations {
    pub(crate) fn for_mode(daemonize: bool) -> Self {
        Destinations {
            syslog: true,
            terminal: !daemonize,
        }
    }
}

fn priority(level: Level) -> libc::c_int {
    match level {
        Level::Error => libc::LOG_ERR,
        Level::Warn => libc::LOG_WARNING,
        Level::Info => libc::LOG_INFO,
        Level::Debug | Level::Trace => libc::LOG_DEBUG,
    }
}

/// Message as handed to syslog; interior NULs would truncate it.
fn message(record: &Record) -> CString {
    let text = record.args().to_string().replace('\0', "\\0");
    CString::new(text).unwrap_or_default()
}

struct Syslog {
    // openlog keeps the pointer, so the string lives as long as the logger
    _ident: CString,
}

impl Syslog {
    fn open(ident: &str) -> anyhow::Result<Self> {
        let ident = CString::new(ident).context("invalid syslog ident")?;
        // SAFETY: `ident` is NUL-terminated and owned by the returned value,
        // which closes the log before dropping it.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_DAEMON) };
        Ok(Syslog { _ident: ident })
    }

    fn send(&self, record: &Record) {
        let msg = message(record);
        // SAFETY: constant "%s" format with exactly one NUL-terminated
        // string argument.
        unsafe {
            libc::syslog(
                priority(record.level()),
                b"%s\0".as_ptr() as *const libc::c_char,
                msg.as_ptr(),
            )
        };
    }
}

impl Drop for Syslog {
    fn drop(&mut self) {
        // SAFETY: takes no arguments; later syslog calls reopen the log.
        unsafe { libc::closelog() };
    }
}

struct Logger {
    level: LevelFilter,
    syslog: Option<Syslog>,
    terminal: Option<env_logger::Logger>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(syslog) = &self.syslog {
            syslog.send(record);
        }
        if let Some(terminal) = &self.terminal {
            terminal.log(record);
        }
    }

    fn flush(&self) {
        if let Some(terminal) = &self.terminal {
            terminal.flush();
        }
    }
}

/// Installs the process-wide logger.
pub(crate) fn init(verbosity: Verbosity, daemonize: bool) -> anyhow::Result<()> {
    let level = verbosity.level_filter();
    let destinations = Destinations::for_mode(daemonize);

    let syslog = if destinations.syslog {
        Some(Syslog::open(IDENT)?)
    } else {
        None
    };
    let terminal = destinations.terminal.then(|| {
        env_logger::Builder::new()
            .filter_level(level)
            .target(env_logger::Target::Stderr)
            .build()
    });

    log::set_boxed_logger(Box::new(Logger {
        level,
        syslog,
        terminal,
    }))
    .context("failed to install logger")?;
    log::set_max_level(level);
    Ok(())
}
