//! Accumulator loop: buffers records and decides when to flush.
//!
//! A batch is flushed when it reaches `batch_size` records, when the sliding
//! `batch_interval` deadline fires, or when the intake closes. Flushing runs
//! the whole delivery sequence inline, so no record is taken off the intake
//! while a batch is in flight.

use crate::batch::BatchBuffer;
use crate::config::ForwarderConfig;
use crate::delivery::{DeliveryClient, DeliveryReport, ErrorSink, FlushTrigger};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Counters returned when the accumulator stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccumulatorStats {
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub records_delivered: u64,
    pub records_failed: u64,
}

impl AccumulatorStats {
    fn record(&mut self, report: &DeliveryReport) {
        let records = report.batch_size as u64;
        if report.delivered {
            self.batches_delivered += 1;
            self.records_delivered += records;
        } else {
            self.batches_failed += 1;
            self.records_failed += records;
        }
    }
}

enum Wake<R> {
    Deadline,
    Record(R),
    Closed,
}

/// Owns the in-progress batch for one input stream.
pub struct Accumulator<R> {
    buffer: BatchBuffer<R>,
    batch_interval: Duration,
    intake: mpsc::Receiver<R>,
    client: DeliveryClient,
    errors: ErrorSink,
    stats: AccumulatorStats,
}

impl<R> Accumulator<R>
where
    R: Serialize + Send + Sync + 'static,
{
    pub fn new(
        config: &ForwarderConfig,
        intake: mpsc::Receiver<R>,
        client: DeliveryClient,
        errors: ErrorSink,
    ) -> Self {
        Self {
            buffer: BatchBuffer::new(config.batch_size),
            batch_interval: config.batch_interval,
            intake,
            client,
            errors,
            stats: AccumulatorStats::default(),
        }
    }

    /// Run until the intake closes, then flush the remainder and stop.
    pub async fn run(mut self) -> AccumulatorStats {
        let mut deadline = self.next_deadline();

        loop {
            // Deadline first: a record arriving at the same instant belongs
            // to the next batch.
            let wake = tokio::select! {
                biased;
                _ = deadline_elapsed(deadline) => Wake::Deadline,
                maybe = self.intake.recv() => match maybe {
                    Some(record) => Wake::Record(record),
                    None => Wake::Closed,
                },
            };

            match wake {
                Wake::Deadline => {
                    self.flush(FlushTrigger::Interval).await;
                    deadline = self.next_deadline();
                }
                Wake::Record(record) => {
                    self.buffer.push(record);
                    if self.buffer.is_full() {
                        self.flush(FlushTrigger::Size).await;
                        deadline = self.next_deadline();
                    }
                }
                Wake::Closed => {
                    debug!(buffered = self.buffer.len(), "Intake closed, draining");
                    self.flush(FlushTrigger::Drain).await;
                    break;
                }
            }
        }

        info!(
            batches_delivered = self.stats.batches_delivered,
            batches_failed = self.stats.batches_failed,
            records_delivered = self.stats.records_delivered,
            records_failed = self.stats.records_failed,
            "Accumulator stopped"
        );
        self.stats
    }

    async fn flush(&mut self, trigger: FlushTrigger) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = self.buffer.take();
        if let Some(report) = self
            .client
            .forward_events(&batch, trigger, &self.errors)
            .await
        {
            self.stats.record(&report);
        }
    }

    /// A fresh deadline measured from now, or none when time flushes are off.
    fn next_deadline(&self) -> Option<Instant> {
        if self.batch_interval.is_zero() {
            None
        } else {
            Some(Instant::now() + self.batch_interval)
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
