use std::{fmt::Write as _, str::FromStr};

use racing_engine::core::{EngineHandle, EngineState};
use thiserror::Error;

/// A console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    Setup,
    Race,
    Pause,
    Resume,
    Finish,
    State,
    Threads,
    /// Show the recent log backlog
    Log,
    Quit(i32),
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("invalid exit code: {0}")]
    BadExitCode(String),
    #[error("unexpected argument to {command}: {argument}")]
    UnexpectedArgument { command: String, argument: String },
}

pub const HELP: &str = "\
menu          go to the main menu
setup         go to race setup
race          start or continue racing
pause         pause the race
resume        resume a paused race
finish        finish the race
state         print the current state
threads       list worker threads
log           print recent log lines
quit [code]   exit with code (default 0)
help          this text";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseError::Empty);
        };
        let head = head.to_ascii_lowercase();
        let argument = words.next();

        let command = match head.as_str() {
            "menu" => Command::Menu,
            "setup" => Command::Setup,
            "race" => Command::Race,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "finish" => Command::Finish,
            "state" => Command::State,
            "threads" => Command::Threads,
            "log" => Command::Log,
            "help" | "?" => Command::Help,
            "quit" | "exit" => {
                let code = match argument {
                    Some(code) => code
                        .parse()
                        .map_err(|_| ParseError::BadExitCode(code.to_owned()))?,
                    None => 0,
                };
                return match words.next() {
                    Some(extra) => Err(ParseError::UnexpectedArgument {
                        command: head,
                        argument: extra.to_owned(),
                    }),
                    None => Ok(Command::Quit(code)),
                };
            }
            _ => return Err(ParseError::Unknown(head)),
        };

        match argument {
            Some(extra) => Err(ParseError::UnexpectedArgument {
                command: head,
                argument: extra.to_owned(),
            }),
            None => Ok(command),
        }
    }
}

impl Command {
    /// Apply the command to the engine and return the text to show the user.
    /// `Log` is handled by the console, which owns the backlog.
    pub fn apply(self, engine: &EngineHandle) -> String {
        match self {
            Command::Menu => enter(engine, EngineState::MainMenu),
            Command::Setup => enter(engine, EngineState::RaceSetup),
            Command::Race => enter(engine, EngineState::Racing),
            Command::Finish => enter(engine, EngineState::RaceFinished),
            Command::Pause => match engine.state() {
                EngineState::Racing => enter(engine, EngineState::Paused),
                other => format!("cannot pause while {other}"),
            },
            Command::Resume => match engine.state() {
                EngineState::Paused => enter(engine, EngineState::Racing),
                other => format!("cannot resume while {other}"),
            },
            Command::State => format!("state: {}", engine.state()),
            Command::Threads => threads(engine),
            Command::Log => String::new(),
            Command::Quit(code) => {
                engine.request_exit(code);
                format!("exiting with code {code}")
            }
            Command::Help => HELP.to_owned(),
        }
    }
}

fn enter(engine: &EngineHandle, state: EngineState) -> String {
    engine.set_state(state);
    format!("state: {}", engine.state())
}

fn threads(engine: &EngineHandle) -> String {
    let registry = engine.registry();
    let mut out = String::new();
    for name in registry.worker_names() {
        if let Ok(status) = registry.status(&name) {
            let _ = writeln!(out, "{name:<30}{status:?}");
        }
    }
    let _ = write!(
        out,
        "{} active / {} max",
        registry.active_count(),
        registry.max_threads()
    );
    out
}
