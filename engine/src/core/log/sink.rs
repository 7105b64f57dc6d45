use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use chrono::{DateTime, Local};
use crossbeam::channel::Receiver;
use crossterm::style::Stylize;
use log::{Metadata, Record};
use parking_lot::Mutex;

use super::{
    Level, LogConfig,
    channel::{Captures, LogMessage},
};

/// Process-wide destination for every log record.
///
/// Console and file output only happen between [`super::init`] and
/// [`super::shutdown`]. Capture channels see every record regardless, so tests can
/// observe logging without depending on global configuration.
pub struct Sink {
    state: Mutex<SinkState>,
}

struct SinkState {
    enabled: bool,
    console: bool,
    min_level: Level,
    file: Option<File>,
    captures: Captures,
}

static SINK: OnceLock<Sink> = OnceLock::new();

pub(crate) fn global() -> &'static Sink {
    SINK.get_or_init(|| Sink {
        state: Mutex::new(SinkState {
            enabled: false,
            console: true,
            min_level: Level::Debug,
            file: None,
            captures: Captures::default(),
        }),
    })
}

impl Sink {
    pub(crate) fn configure(&self, config: &LogConfig) -> io::Result<()> {
        let file = match &config.file {
            Some(path) => Some(open_append(path)?),
            None => None,
        };

        let mut state = self.state.lock();
        state.enabled = true;
        state.console = config.console;
        state.min_level = config.level;
        state.file = file;
        Ok(())
    }

    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if let Some(mut file) = state.file.take() {
            let _ = file.flush();
        }
        state.enabled = false;
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub(crate) fn subscribe(&self) -> Receiver<LogMessage> {
        self.state.lock().captures.subscribe()
    }

    pub(crate) fn emit(&self, level: Level, tag: &str, message: &str) {
        let mut state = self.state.lock();

        state.captures.publish(&LogMessage {
            level,
            tag: tag.to_owned(),
            message: message.to_owned(),
        });

        if !state.enabled || level < state.min_level {
            return;
        }

        let line = format_line(&Local::now(), level, tag, message);

        if state.console {
            write_console(level, &line);
        }
        if let Some(file) = state.file.as_mut() {
            // A failing log file must never take the caller down with it.
            let _ = writeln!(file, "{line}").and_then(|_| file.flush());
        }
    }
}

impl log::Log for Sink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.emit(
                Level::from(record.level()),
                record.target(),
                &record.args().to_string(),
            );
        }
    }

    fn flush(&self) {
        if let Some(file) = self.state.lock().file.as_mut() {
            let _ = file.flush();
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `YYYY-MM-DD HH:MM:SS.mmm [LEVEL] [TAG] MESSAGE`
pub fn format_line(timestamp: &DateTime<Local>, level: Level, tag: &str, message: &str) -> String {
    format!(
        "{} [{}] [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level.label(),
        tag,
        message
    )
}

fn write_console(level: Level, line: &str) {
    let mut out = io::stdout().lock();
    let _ = match level {
        Level::Debug => writeln!(out, "{}", line.dark_grey()),
        Level::Info => writeln!(out, "{line}"),
        Level::Warn => writeln!(out, "{}", line.dark_yellow()),
        Level::Error => writeln!(out, "{}", line.dark_red()),
        Level::Fatal => writeln!(out, "{}", line.white().on_dark_red()),
    };
}
