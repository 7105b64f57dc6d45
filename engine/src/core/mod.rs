pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod profiler;
pub mod state;
pub mod subsystem;
pub mod tasks;
pub mod thread;
pub mod time;

pub use config::EngineConfig;
pub use engine::{Engine, EngineHandle, Frame, GENERAL_POOL};
pub use error::{ConfigError, EngineError, SubsystemError, ThreadError};
pub use profiler::{Profiler, SortBy, profile_scope};
pub use state::EngineState;
pub use subsystem::{Slot, Subsystem};
pub use tasks::Task;
pub use thread::{ThreadPriority, ThreadRegistry, ThreadStatus, WorkerRole};
pub use time::{Clock, FrameTiming, ManualClock, SystemClock};
