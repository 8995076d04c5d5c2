//! # Event Sources
//!
//! Abstraction over the device connection. The real reader protocol lives
//! outside this crate; anything that can connect, deliver batches through a
//! callback, and disconnect can drive the pipeline.

pub mod simulated;

pub use simulated::{SimulatedConfig, SimulatedSource};

use crate::error::Result;
use crate::types::EventBatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Callback a source invokes with each batch of raw events.
///
/// May be called from any thread the source owns. Must return quickly.
pub type BatchCallback = Arc<dyn Fn(EventBatch) + Send + Sync>;

/// Network location of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint {
    pub host: String,
    pub port: u16,
}

impl SourceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for SourceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opaque, source-specific connection options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceConfig {
    pub options: Map<String, Value>,
}

impl SourceConfig {
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }
}

/// A device connection producing batches of events.
///
/// Contract: once `disconnect` has returned, no callback invocation is in
/// progress and none will start until the next `connect`.
pub trait EventSource: Send {
    /// Install the batch callback. Replaces any previous one.
    fn register_callback(&mut self, callback: BatchCallback);

    /// Open the connection and begin delivering batches.
    fn connect(&mut self, endpoint: &SourceEndpoint, config: &SourceConfig) -> Result<()>;

    /// Close the connection. Completes or fails in bounded time.
    fn disconnect(&mut self) -> Result<()>;
}
