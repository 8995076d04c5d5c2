//! Simulated reader.
//!
//! Emits batches of tag reports shaped like an LLRP reader's (`EPC-96`,
//! `AntennaID`, `PeakRSSI`, `TagSeenCount`) from a fixed tag pool, on a
//! worker thread. A small share of reports carries no EPC field at all.

use super::{BatchCallback, EventSource, SourceConfig, SourceEndpoint};
use crate::error::{IngestError, Result};
use crate::types::{Event, EventBatch};
use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Simulation parameters. Each can be overridden through `SourceConfig`
/// options of the same name.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Number of distinct tags in the field
    pub tag_pool: u64,
    /// Delay between batches
    pub batch_interval: Duration,
    /// Upper bound on reports per batch
    pub max_batch: u64,
    /// Probability that a report has no EPC field
    pub missing_epc_ratio: f64,
    /// Number of antennas reports are spread across
    pub antennas: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            tag_pool: 32,
            batch_interval: Duration::from_millis(250),
            max_batch: 6,
            missing_epc_ratio: 0.02,
            antennas: 4,
        }
    }
}

impl SimulatedConfig {
    fn with_overrides(&self, config: &SourceConfig) -> Self {
        Self {
            tag_pool: config.get_u64("tag_pool").unwrap_or(self.tag_pool).max(1),
            batch_interval: config
                .get_u64("batch_interval_ms")
                .map(Duration::from_millis)
                .unwrap_or(self.batch_interval),
            max_batch: config.get_u64("max_batch").unwrap_or(self.max_batch),
            missing_epc_ratio: config
                .get_f64("missing_epc_ratio")
                .unwrap_or(self.missing_epc_ratio)
                .clamp(0.0, 1.0),
            antennas: config.get_u64("antennas").unwrap_or(self.antennas).max(1),
        }
    }
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct SimulatedSource {
    config: SimulatedConfig,
    callback: Option<BatchCallback>,
    worker: Option<Worker>,
}

impl SimulatedSource {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            callback: None,
            worker: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.worker.is_some()
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

fn epc_for(index: u64) -> String {
    format!("3008{:020X}", index)
}

fn generate_batch(rng: &mut impl Rng, config: &SimulatedConfig) -> EventBatch {
    let size = rng.gen_range(0..=config.max_batch);
    (0..size)
        .map(|_| {
            let mut event = Event::new();
            if !rng.gen_bool(config.missing_epc_ratio) {
                event = event.with_field("EPC-96", epc_for(rng.gen_range(0..config.tag_pool)));
            }
            event
                .with_field("AntennaID", rng.gen_range(1..=config.antennas))
                .with_field("PeakRSSI", rng.gen_range(-80i64..=-30))
                .with_field("TagSeenCount", rng.gen_range(1u64..=4))
        })
        .collect()
}

impl EventSource for SimulatedSource {
    fn register_callback(&mut self, callback: BatchCallback) {
        self.callback = Some(callback);
    }

    fn connect(&mut self, endpoint: &SourceEndpoint, config: &SourceConfig) -> Result<()> {
        if self.worker.is_some() {
            debug!("Simulated reader already connected to {}", endpoint);
            return Ok(());
        }

        let callback = self
            .callback
            .clone()
            .ok_or_else(|| IngestError::DeviceConnection {
                address: endpoint.to_string(),
                reason: "no callback registered".to_string(),
            })?;

        let params = self.config.with_overrides(config);
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();

        let handle = thread::Builder::new()
            .name("simulated-reader".to_string())
            .spawn(move || {
                let mut rng = rand::thread_rng();
                while worker_running.load(Ordering::SeqCst) {
                    thread::sleep(params.batch_interval);
                    if !worker_running.load(Ordering::SeqCst) {
                        break;
                    }
                    callback(generate_batch(&mut rng, &params));
                }
            })
            .map_err(|e| IngestError::DeviceConnection {
                address: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        info!("Simulated reader connected to {}", endpoint);
        self.worker = Some(Worker { running, handle });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        worker.running.store(false, Ordering::SeqCst);
        worker
            .handle
            .join()
            .map_err(|_| IngestError::DeviceConnection {
                address: "simulated".to_string(),
                reason: "reader worker panicked".to_string(),
            })?;

        info!("Simulated reader disconnected");
        Ok(())
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
