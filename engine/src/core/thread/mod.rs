//! Named OS threads with cooperative lifecycle control.
//!
//! Every worker runs its body inside a wrapper that publishes a [`ThreadStatus`],
//! honours pause requests by parking on a condition variable, and exits once a
//! stop is requested. Bodies are either one-shot (run once) or looping (re-run
//! until stopped):
//!
//! ```rust,ignore
//! let registry = ThreadRegistry::new();
//! registry.initialize(0)?;
//! registry.create_looping_worker("Telemetry", move || sample(), ThreadPriority::Low)?;
//! registry.pause_worker("Telemetry")?;
//! registry.stop_worker("Telemetry")?;
//! ```

mod native;
mod registry;
mod worker;

use crate::sync::StateValue;

pub use native::posix_sched_param;
pub use registry::ThreadRegistry;
pub(crate) use registry::logged;
pub(crate) use worker::{Body, panic_message};

/// Log tag for everything the registry and its workers report.
pub(crate) const TAG: &str = "ThreadRegistry";

/// Observable lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadStatus {
    /// Spawned, body not yet entered
    #[default]
    Idle,
    Running,
    /// Parked until resumed or stopped
    Paused,
    /// Body has returned, wrapper is exiting
    Stopping,
    Stopped,
}

impl StateValue for ThreadStatus {
    fn to_raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ThreadStatus::Running,
            2 => ThreadStatus::Paused,
            3 => ThreadStatus::Stopping,
            4 => ThreadStatus::Stopped,
            _ => ThreadStatus::Idle,
        }
    }
}

/// Scheduling priority requested for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadPriority {
    Low,
    #[default]
    Normal,
    High,
    /// Round-robin real-time scheduling where the platform allows it
    RealTime,
}

/// Whether the wrapper runs the body once or until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    OneShot,
    Looping,
}
