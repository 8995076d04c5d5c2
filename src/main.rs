//! # Tag Ingest Entry Point
//!
//! Wires a reader, the CSV record log and a console view together, then
//! takes `start` / `stop` / `status` / `quit` commands from stdin.

use clap::Parser;
use log::{error, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tag_ingest::notify;
use tag_ingest::presentation::request_shutdown;
use tag_ingest::{
    Config, ConsoleSink, ControllerConfig, CsvRecordStore, PollerConfig, PresentationPoller,
    RecordStoreConfig, SessionController, SimulatedSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "tag-ingest")]
#[command(about = "Record and display tags seen by a reader", long_about = None)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, env = "TAG_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Reader host name or IP address
    #[arg(long, env = "TAG_INGEST_READER_HOST")]
    reader_host: Option<String>,

    /// Reader port
    #[arg(long, env = "TAG_INGEST_READER_PORT")]
    reader_port: Option<u16>,

    /// Record log path
    #[arg(short, long, env = "TAG_INGEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Substring marking the identifying field
    #[arg(long)]
    marker: Option<String>,

    /// Ingest loop poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Start a session right away
    #[arg(long)]
    autostart: bool,
}

impl Cli {
    fn resolve_config(&self) -> tag_ingest::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = &self.reader_host {
            config.reader_host = host.clone();
        }
        if let Some(port) = self.reader_port {
            config.reader_port = port;
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(marker) = &self.marker {
            config.identifier_marker = marker.clone();
        }
        if let Some(poll_ms) = self.poll_ms {
            config.ingest_poll_ms = poll_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    println!("=================================================");
    println!("  Tag Ingest - Reader Controller                 ");
    println!("=================================================");
    println!("  - Reader:     {}:{}", config.reader_host, config.reader_port);
    println!("  - Record log: {}", config.output_path.display());
    println!("  - Marker:     {}", config.identifier_marker);
    println!();

    let store = Arc::new(CsvRecordStore::new(RecordStoreConfig::from_config(&config)));
    let (notifier, receiver) = notify::channel();

    let mut controller = SessionController::new(
        ControllerConfig::from_config(&config),
        SimulatedSource::default(),
        store.clone(),
        notifier,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = PresentationPoller::new(
        receiver,
        ConsoleSink::new(std::io::stdout()),
        PollerConfig {
            interval: config.presentation_poll_interval(),
        },
    );
    let presentation = tokio::spawn(poller.run(shutdown_rx));

    if cli.autostart {
        controller.start()?;
    }

    println!("Commands: start, stop, status, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            // start may wait for the previous session's ingest thread
            "start" => {
                if let Err(e) = tokio::task::block_in_place(|| controller.start()) {
                    error!("Failed to start session: {}", e);
                }
            }
            "stop" => {
                controller.stop();
            }
            "status" => {
                let stats = controller.stats();
                let log_stats = store.stats();
                println!("Status: {}", controller.state());
                println!(
                    "  events={} recorded={} distinct={} skipped={} failed={}",
                    stats.events_processed,
                    stats.records_appended,
                    stats.distinct_seen,
                    stats.unknown_skipped,
                    stats.append_failures
                );
                println!(
                    "  log {}: {} written, {} failed",
                    log_stats.path.display(),
                    log_stats.records_written,
                    log_stats.failed_writes
                );
            }
            "quit" | "exit" => break,
            "" => {}
            other => warn!("Unknown command: {}", other),
        }
    }

    tokio::task::block_in_place(|| controller.dispose());
    drop(controller);
    request_shutdown(&shutdown_tx);
    presentation.await?;

    println!("=================================================");
    println!("  Reader Controller Shut Down");
    println!("=================================================");

    Ok(())
}
