//! Named worker pools fed from a shared task queue.

mod pool;

pub use pool::Task;
pub(crate) use pool::Pool;
