//! Colored status-line logger behind the `log` facade.
//!
//! Lines look like `(o_o) [INFO ]: Creating new HD image...`. Info and
//! lower go to stdout, warnings and errors to stderr.
//!
//! Level comes from `KBOOT_LOG` (default `info`). Set `NO_COLOR` to drop
//! the escape codes.

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// Environment variable selecting the maximum log level.
pub const LEVEL_ENV: &str = "KBOOT_LOG";

pub struct StatusLogger {
    max_level: LevelFilter,
    color: bool,
}

impl StatusLogger {
    pub const fn new(max_level: LevelFilter, color: bool) -> Self {
        Self { max_level, color }
    }

    /// Logger configured from the environment.
    pub fn from_env() -> Self {
        let max_level = std::env::var(LEVEL_ENV)
            .ok()
            .and_then(|raw| parse_level(&raw))
            .unwrap_or(LevelFilter::Info);
        let color = std::env::var_os("NO_COLOR").is_none();
        Self::new(max_level, color)
    }

    /// Install as the global logger. Call once at startup.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        if !self.color {
            colored::control::set_override(false);
        }
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    /// Render one status line without the trailing newline.
    pub fn format_line(&self, level: Level, message: &str) -> String {
        let (face, tag) = decoration(level);
        let prefix = format!("{face} [{tag}]:");
        if !self.color {
            return format!("{prefix} {message}");
        }
        let prefix = match level {
            Level::Error => prefix.red(),
            Level::Warn => prefix.yellow(),
            Level::Info => prefix.blue(),
            Level::Debug | Level::Trace => prefix.dimmed(),
        };
        format!("{prefix} {message}")
    }
}

impl Log for StatusLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format_line(record.level(), &record.args().to_string());
        // A closed pipe must not abort the build.
        let _ = match record.level() {
            Level::Error | Level::Warn => writeln!(std::io::stderr().lock(), "{line}"),
            _ => writeln!(std::io::stdout().lock(), "{line}"),
        };
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

fn decoration(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => ("(X_X)", "ERROR"),
        Level::Warn => ("(0_0)", "WARN "),
        Level::Info => ("(o_o)", "INFO "),
        Level::Debug => ("(-_-)", "DEBUG"),
        Level::Trace => ("(._.)", "TRACE"),
    }
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}
