//! Host-side collaborators that drive a running engine from other threads: a
//! scripted demo driver and an interactive command console.

pub mod command;
pub mod console;
pub mod demo;

pub use command::{Command, ParseError};
pub use console::Console;
pub use demo::{DemoAction, DemoDriver, DemoStep};
