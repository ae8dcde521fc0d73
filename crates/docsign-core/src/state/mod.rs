//! State management for signing processes.
//!
//! Contains the process state machine, which validates lifecycle
//! transitions and produces the events of each operation.

pub mod process;

pub use process::{ProcessState, SigningError};
