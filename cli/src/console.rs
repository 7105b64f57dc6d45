use std::{
    collections::VecDeque,
    io,
    thread::{self, JoinHandle},
};

use crossbeam::channel::Receiver;
use crossterm::style::Stylize;
use log::{info, warn};
use racing_engine::core::{
    EngineHandle,
    log::{Level, LogMessage},
};
use rustyline::{Editor, error::ReadlineError};

use crate::command::Command;

const TAG: &str = "Console";
const PROMPT: &str = "race> ";

/// Log lines kept for the `log` command.
const BACKLOG: usize = 30;

/// Line-oriented command console driving an engine from stdin.
///
/// When given a log tail, records logged since the last prompt are printed
/// before the next one.
pub struct Console {
    engine: EngineHandle,
    log_tail: Option<Receiver<LogMessage>>,
    backlog: VecDeque<String>,
}

impl Console {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            log_tail: None,
            backlog: VecDeque::with_capacity(BACKLOG),
        }
    }

    pub fn with_log_tail(mut self, log_tail: Receiver<LogMessage>) -> Self {
        self.log_tail = Some(log_tail);
        self
    }

    /// Run the console on its own thread. The thread is detached by the
    /// caller: a pending `readline` cannot be interrupted, so the engine must
    /// not wait on it.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(TAG.to_owned())
            .spawn(move || self.run())
    }

    /// Read and apply commands until `quit`, end of input, or Ctrl-C.
    pub fn run(mut self) {
        let mut editor = Editor::<()>::new();
        println!("Type `help` for commands.");
        loop {
            for line in self.drain_log() {
                println!("{line}");
            }
            match editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line.as_str());
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                    info!(target: TAG, "Input closed, requesting exit");
                    self.engine.request_exit(0);
                    break;
                }
                Err(err) => {
                    warn!(target: TAG, "Console input failed: {err}");
                    self.engine.request_exit(0);
                    break;
                }
            }
        }
    }

    /// Apply one input line and print its result. Returns `false` once the
    /// console should stop reading.
    fn handle_line(&mut self, line: &str) -> bool {
        match line.parse::<Command>() {
            Ok(Command::Log) => {
                self.drain_log();
                for line in &self.backlog {
                    println!("{line}");
                }
                true
            }
            Ok(command) => {
                println!("{}", command.apply(&self.engine));
                !matches!(command, Command::Quit(_))
            }
            Err(err) => {
                println!("{}", err.to_string().dark_yellow());
                true
            }
        }
    }

    /// Pull every pending record off the tail into the backlog and return
    /// them styled for the terminal.
    fn drain_log(&mut self) -> Vec<String> {
        let Some(tail) = &self.log_tail else {
            return Vec::new();
        };
        let fresh: Vec<LogMessage> = tail.try_iter().collect();
        let mut styled = Vec::with_capacity(fresh.len());
        for message in fresh {
            let line = plain_line(&message);
            styled.push(style(message.level, &line));
            push_bounded(&mut self.backlog, line, BACKLOG);
        }
        styled
    }
}

fn plain_line(message: &LogMessage) -> String {
    format!("[{}] [{}] {}", message.level.label(), message.tag, message.message)
}

fn style(level: Level, line: &str) -> String {
    match level {
        Level::Debug => line.dark_grey().to_string(),
        Level::Info => line.to_owned(),
        Level::Warn => line.dark_yellow().to_string(),
        Level::Error => line.dark_red().to_string(),
        Level::Fatal => line.white().on_dark_red().to_string(),
    }
}

fn push_bounded(backlog: &mut VecDeque<String>, line: String, limit: usize) {
    if backlog.len() == limit {
        backlog.pop_front();
    }
    backlog.push_back(line);
}
