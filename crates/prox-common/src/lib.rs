//! prox common types and errors.
//!
//! This crate provides foundational types shared across prox-core modules:
//! - Process identity types
//! - Controlling-terminal sentinel handling
//! - The unified error taxonomy

pub mod error;
pub mod id;

pub use error::{Error, ErrorCategory, Result};
pub use id::{canonical_tty, is_no_tty_marker, ProcessId, NO_TTY};
