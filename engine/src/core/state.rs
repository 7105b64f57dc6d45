use std::fmt;

use crate::sync::StateValue;

/// Enumeration of the states the game can be in.
///
/// Any state may follow any other; `Uninitialized` is only legal before
/// `initialize` and after `shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    /// The engine has not been initialized, or has been shut down
    #[default]
    Uninitialized,
    /// Resources are being loaded
    Loading,
    MainMenu,
    /// The player is choosing track, car and opponents
    RaceSetup,
    /// A race is in progress; the only state that steps physics
    Racing,
    Paused,
    RaceFinished,
    /// The engine is tearing down
    Exiting,
}

impl EngineState {
    pub const ALL: [EngineState; 8] = [
        EngineState::Uninitialized,
        EngineState::Loading,
        EngineState::MainMenu,
        EngineState::RaceSetup,
        EngineState::Racing,
        EngineState::Paused,
        EngineState::RaceFinished,
        EngineState::Exiting,
    ];
}

impl StateValue for EngineState {
    fn to_raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => EngineState::Loading,
            2 => EngineState::MainMenu,
            3 => EngineState::RaceSetup,
            4 => EngineState::Racing,
            5 => EngineState::Paused,
            6 => EngineState::RaceFinished,
            7 => EngineState::Exiting,
            _ => EngineState::Uninitialized,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
