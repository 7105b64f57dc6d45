//! Runtime for a car-racing simulation: the fixed-step game loop and its state
//! machine, a registry of named worker threads with pools, and the
//! synchronization primitives they share.
//!
//! ```rust,ignore
//! use racing_engine::core::{Engine, EngineConfig, EngineState};
//!
//! let mut engine = Engine::new();
//! engine.register_state_callback(EngineState::Loading, |handle| {
//!     handle.set_state(EngineState::MainMenu);
//! });
//! engine.initialize(EngineConfig::default())?;
//! std::process::exit(engine.run());
//! ```

pub mod core;
pub mod sync;
