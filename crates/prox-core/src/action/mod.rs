//! Process control.

pub mod control;
pub mod inject;

pub use control::{ControlError, Controller};
pub use inject::{inject_bytes, InjectError};
