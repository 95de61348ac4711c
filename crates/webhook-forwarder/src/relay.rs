//! Relay: pumps an external record stream into the accumulator.

use crate::accumulator::{Accumulator, AccumulatorStats};
use crate::config::ForwarderConfig;
use crate::delivery::{millis, report_failure, DeliveryClient, ErrorSink};
use crate::error::{ForwarderError, ForwarderResult};
use crate::transport::{HttpTransport, Transport};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Entry point of the forwarding pipeline.
///
/// Built once at startup and shared by reference; it owns the configuration
/// and the delivery client. Each call to [`Relay::forward`] runs its own
/// accumulator for the stream it is given.
pub struct Relay {
    config: ForwarderConfig,
    client: DeliveryClient,
    cancel: CancellationToken,
}

impl Relay {
    /// Create a relay delivering over HTTP.
    pub fn new(config: ForwarderConfig) -> ForwarderResult<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a relay delivering through `transport`.
    pub fn with_transport(
        config: ForwarderConfig,
        transport: Arc<dyn Transport>,
    ) -> ForwarderResult<Self> {
        config.validate()?;

        if !config.size_trigger_enabled() && !config.interval_trigger_enabled() {
            warn!("batch size and batch interval both disabled, records are only sent when the input closes");
        }

        let cancel = CancellationToken::new();
        let client = DeliveryClient::new(&config, transport, cancel.clone());

        Ok(Self {
            config,
            client,
            cancel,
        })
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Token that aborts pumping and any delivery in progress.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Forward every record of `records` until the stream ends.
    ///
    /// Spawns the accumulator, then pumps records into its bounded intake,
    /// suspending while the intake is full. When the stream ends the
    /// remaining partial batch is flushed before this returns. Cancellation
    /// stops pumping; the final flush then reports `Cancelled`, and a record
    /// already pulled but not yet queued is reported as its own `Cancelled`
    /// batch.
    pub async fn forward<R, S>(
        &self,
        records: S,
        errors: ErrorSink,
    ) -> ForwarderResult<AccumulatorStats>
    where
        R: Serialize + Send + Sync + 'static,
        S: Stream<Item = R>,
    {
        let (intake, intake_rx) = mpsc::channel(self.config.queue_capacity);
        let accumulator =
            Accumulator::new(&self.config, intake_rx, self.client.clone(), errors.clone());
        let handle = tokio::spawn(accumulator.run());

        info!(
            endpoint = %self.config.endpoint,
            batch_size = self.config.batch_size,
            batch_interval_ms = millis(self.config.batch_interval),
            retry_limit = self.config.retry_limit,
            queue_capacity = self.config.queue_capacity,
            "Relay started"
        );

        let mut pumped: u64 = 0;
        // Pulled from the stream but never handed to the accumulator.
        let mut stranded: usize = 0;
        tokio::pin!(records);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(pumped, "Relay cancelled");
                    break;
                }
                next = records.next() => next,
            };

            let Some(record) = next else {
                debug!(pumped, "Input stream closed");
                break;
            };

            // Reserve first so the record stays with us if cancellation wins.
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(pumped, "Relay cancelled while intake was full");
                    stranded += 1;
                    break;
                }
                permit = intake.reserve() => permit,
            };

            match permit {
                Ok(permit) => permit.send(record),
                Err(_) => {
                    warn!(pumped, "Accumulator stopped before the input closed");
                    stranded += 1;
                    break;
                }
            }
            pumped += 1;
        }

        // Closing the intake lets the accumulator drain and exit.
        drop(intake);
        let mut stats = handle.await?;

        if stranded > 0 {
            report_failure(&errors, ForwarderError::Cancelled { batch_size: stranded });
            stats.batches_failed += 1;
            stats.records_failed += stranded as u64;
        }
        Ok(stats)
    }
}
