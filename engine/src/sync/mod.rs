//! Synchronization primitives shared by the runtime and its workers.
//!
//! - [`AtomicState`]: atomic cell for enumerated state values
//! - [`Queue`]: unbounded FIFO with blocking and non-blocking pop
//! - [`RwLock`]: multiple-reader / single-writer lock with scoped guards
//! - [`DoubleBuffer`]: two-slot buffer for producer/consumer snapshot hand-off

pub mod atomic_state;
pub mod double_buffer;
pub mod queue;
pub mod rw_lock;

pub use atomic_state::{AtomicState, StateValue};
pub use double_buffer::DoubleBuffer;
pub use queue::Queue;
pub use rw_lock::RwLock;
