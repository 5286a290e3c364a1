//! ETL Recorder - Keystroke, pause and gaze telemetry for writing sessions
//!
//! The recorder captures what a participant does while writing about a
//! stimulus: every key press, every text mutation (classified as a single
//! insert / delete / replace), idle pauses, and where their gaze dwelt.
//!
//! ## Modules
//!
//! - **Core**: [`diff`], [`pause`] and [`dwell`] are pure, timestamp-driven
//!   state machines, orchestrated by [`SessionRecorder`].
//! - **Live driver**: [`LiveSession`] runs the pause checker and gaze poller
//!   as cancellable tokio tasks against a shared [`Clock`].
//! - **Replay**: [`schema`] replays captured input event streams offline.
//! - **FFI**: C bindings for embedding the recorder in a host UI.

pub mod aoi;
pub mod clock;
pub mod config;
pub mod diff;
pub mod dwell;
pub mod encoder;
pub mod error;
pub mod live;
pub mod pause;
pub mod recorder;
pub mod schema;
pub mod sensor;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aoi::{AoiClassifier, AoiLayout, Rect};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::RecorderConfig;
pub use diff::diff;
pub use dwell::DwellSegmenter;
pub use encoder::SessionLogEncoder;
pub use error::RecorderError;
pub use live::LiveSession;
pub use pause::{PauseState, PauseTracker};
pub use recorder::SessionRecorder;
pub use sensor::{GazePoint, GazeSensor};
pub use types::{
    DwellSegment, EditOp, GazeSample, GazeSide, KeyEvent, PauseInterval, RecorderStatus,
    SessionLog, SessionMeta, TextChange,
};

// Schema exports
pub use schema::{validate_events, InputEvent, InputEventAdapter, Replayer};

/// Recorder version
pub const RECORDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "etl-recorder";
