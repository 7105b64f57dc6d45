//! Benchmarks for the racing engine runtime.
//!
//! - **Primitives**: queue push/pop, state CAS under contention, double-buffer publish
//! - **Pool**: task fan-out across `GeneralPool`-style worker pools
//! - **Frame timing**: statistics over engine frame steps ([`frame_timer`])
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench -p racing_bench
//!
//! # One group only
//! cargo bench -p racing_bench -- queue
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.

pub mod frame_timer;
