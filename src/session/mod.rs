//! Session lifecycle: start/stop control and the ingest thread.

pub mod controller;

pub use controller::{CommandOutcome, ControllerConfig, SessionController};
