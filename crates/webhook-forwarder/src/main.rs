//! Webhook forwarder binary entry point.
//!
//! Usage: webhook-forwarder --endpoint <url> [--batch-size <n>] [--batch-interval-ms <ms>]
//!
//! Reads newline-delimited JSON records from stdin and forwards them in
//! batches. Exits after stdin closes and the last batch has been handled,
//! or on Ctrl-C.

use clap::Parser;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use webhook_forwarder::logging::{self, LogConfig};
use webhook_forwarder::{ingest, ForwarderConfig, ForwarderResult, Relay};

/// Batching webhook forwarder.
#[derive(Parser, Debug)]
#[command(name = "webhook-forwarder")]
#[command(about = "Forward newline-delimited JSON records to a webhook in batches")]
struct Args {
    /// Webhook endpoint receiving POSTed batches.
    #[arg(long, env = "FORWARDER_ENDPOINT")]
    endpoint: String,

    /// Flush after this many records (0 disables).
    #[arg(long, env = "FORWARDER_BATCH_SIZE", default_value = "0")]
    batch_size: usize,

    /// Flush buffered records after this many milliseconds (0 disables).
    #[arg(long, env = "FORWARDER_BATCH_INTERVAL_MS", default_value = "0")]
    batch_interval_ms: u64,

    /// Retries after the first attempt.
    #[arg(long, env = "FORWARDER_RETRY_LIMIT", default_value = "3")]
    retry_limit: u32,

    /// Pause before each retry in milliseconds.
    #[arg(long, env = "FORWARDER_RETRY_SLEEP_MS", default_value = "2000")]
    retry_sleep_ms: u64,

    /// Records buffered between stdin and the batcher before reading pauses.
    #[arg(long, env = "FORWARDER_QUEUE_CAPACITY", default_value = "256")]
    queue_capacity: usize,

    /// Timeout of each HTTP attempt in seconds.
    #[arg(long, env = "FORWARDER_REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Log level or filter directives, e.g. `debug` or `webhook_forwarder=debug,info`
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ForwarderResult<()> {
    let args = Args::parse();

    logging::init_logging(&LogConfig {
        default_level: args.log_level,
        json: args.log_json,
    })?;

    info!("Webhook forwarder starting...");

    let config = ForwarderConfig::new(args.endpoint)
        .with_batch_size(args.batch_size)
        .with_batch_interval(Duration::from_millis(args.batch_interval_ms))
        .with_retry_limit(args.retry_limit)
        .with_retry_sleep_interval(Duration::from_millis(args.retry_sleep_ms))
        .with_queue_capacity(args.queue_capacity)
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs));

    let relay = Relay::new(config)?;

    // Drain terminal failures so delivery never finds the sink full.
    let (errors, mut error_rx) = mpsc::channel(relay.config().error_queue_capacity);
    let error_reader = tokio::spawn(async move {
        let mut failures: u64 = 0;
        while let Some(err) = error_rx.recv().await {
            failures += 1;
            error!(error = %err, "Webhook delivery failed");
        }
        failures
    });

    let cancel = relay.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping...");
            cancel.cancel();
        }
    });

    let records = ingest::receiver_stream(ingest::spawn_stdin_reader(
        relay.config().queue_capacity,
    )?);
    let stats = relay.forward(records, errors).await?;
    let failures = error_reader.await?;

    info!(
        batches_delivered = stats.batches_delivered,
        records_delivered = stats.records_delivered,
        batches_failed = stats.batches_failed,
        records_failed = stats.records_failed,
        reported_failures = failures,
        "Webhook forwarder stopped"
    );

    Ok(())
}
