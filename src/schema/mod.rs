//! Captured input event streams
//!
//! This module defines the replayable input schema and the driver that turns a
//! captured stream back into a session log.

mod input_event;
mod replay;

pub use input_event::*;
pub use replay::*;
