//! Process-wide logging sink behind the `log` facade.
//!
//! Engine code logs through the ordinary `log` macros and uses the record target
//! as the tag:
//!
//! ```rust,ignore
//! log::info!(target: "GameEngine", "Starting main game loop");
//! ```
//!
//! [`init`] installs the sink (once) and applies a [`LogConfig`]. Each record becomes
//! one line, `YYYY-MM-DD HH:MM:SS.mmm [LEVEL] [TAG] MESSAGE`, written to the console
//! in colour and appended to the configured file. [`capture`] hands out a channel
//! receiving every record, which is how tests and the command console observe the log.
//!
//! The `log` facade has no level above `Error`; use [`fatal`] or the [`fatal!`]
//! macro for `FATAL` records.

mod channel;
mod sink;

use std::{io, path::PathBuf};

use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};

pub use channel::LogMessage;
pub use sink::{Sink, format_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Fixed-width label used in formatted lines.
    pub fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Echo records to stdout.
    pub console: bool,
    /// Append records to this file.
    pub file: Option<PathBuf>,
    /// Records below this level are dropped.
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console: true,
            file: Some(PathBuf::from("game.log")),
            level: Level::Debug,
        }
    }
}

/// Install the sink as the global logger (first call only) and apply `config`.
///
/// Later calls reconfigure the existing sink. If the host already installed a
/// different `log` implementation, records keep going there and only [`fatal`]
/// and [`capture`] use this sink.
pub fn init(config: &LogConfig) -> io::Result<()> {
    let sink = sink::global();
    if log::set_logger(sink).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
    sink.configure(config)?;
    log::info!(target: "Logger", "Logging system initialized");
    Ok(())
}

/// Flush and close the log file and stop console output.
pub fn shutdown() {
    let sink = sink::global();
    if sink.is_enabled() {
        log::info!(target: "Logger", "Logging system shutting down");
        sink.close();
    }
}

pub fn is_initialized() -> bool {
    sink::global().is_enabled()
}

/// Subscribe to every record the sink receives from now on.
pub fn capture() -> Receiver<LogMessage> {
    sink::global().subscribe()
}

/// Emit a `FATAL` record.
pub fn fatal(tag: &str, message: &str) {
    sink::global().emit(Level::Fatal, tag, message);
}

/// `fatal!(target: "Main", "failed: {}", reason)`
#[macro_export]
macro_rules! fatal {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::core::log::fatal($target, &::std::format!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn labels_are_five_characters() {
        for level in [Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal] {
            assert_eq!(level.label().len(), 5);
        }
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(Level::from(log::Level::Trace), Level::Debug);
    }

    #[test]
    fn config_parses_lowercase_level() {
        let config: LogConfig = toml::from_str("level = \"warn\"\nconsole = false").unwrap();
        assert_eq!(config.level, Level::Warn);
        assert!(!config.console);
        assert_eq!(config.file, Some(PathBuf::from("game.log")));
    }

    #[test]
    fn facade_records_reach_capture() {
        let rx = capture();
        init(&LogConfig {
            console: false,
            file: None,
            level: Level::Debug,
        })
        .unwrap();

        log::warn!(target: "CaptureTest", "warned {}", 7);
        crate::fatal!(target: "CaptureTest", "fatal {}", 8);

        let seen: Vec<LogMessage> = std::iter::from_fn(|| rx.recv_timeout(Duration::from_secs(1)).ok())
            .filter(|m| m.tag == "CaptureTest")
            .take(2)
            .collect();

        assert_eq!(seen[0].level, Level::Warn);
        assert_eq!(seen[0].message, "warned 7");
        assert_eq!(seen[1].level, Level::Fatal);
        assert_eq!(seen[1].message, "fatal 8");
    }
}
