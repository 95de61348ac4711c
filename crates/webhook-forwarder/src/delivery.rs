//! Batch delivery with fixed-interval retries.

use crate::config::ForwarderConfig;
use crate::error::{DeliveryError, ForwarderError};
use crate::transport::{OutboundRequest, Transport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Channel receiving terminal per-batch failures.
///
/// Delivery never waits on it: reports that do not fit are logged and
/// dropped, so size it (see `ForwarderConfig::error_queue_capacity`) and keep
/// a reader draining it.
pub type ErrorSink = mpsc::Sender<ForwarderError>;

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The buffer reached `batch_size`.
    Size,
    /// The sliding deadline fired.
    Interval,
    /// The input stream closed with records still buffered.
    Drain,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Interval => "interval",
            Self::Drain => "drain",
        }
    }
}

/// Result of one attempt sequence.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Final HTTP status, 0 if no response was ever obtained.
    pub status: u16,
    /// Set when the batch was not delivered.
    pub error: Option<DeliveryError>,
    /// HTTP attempts made (0 for fatal pre-flight failures).
    pub attempts: u32,
}

impl DeliveryOutcome {
    fn failed(status: u16, error: DeliveryError, attempts: u32) -> Self {
        Self {
            status,
            error: Some(error),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of one flush, returned once the failure (if any) has been
/// handed to the error sink.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub trigger: FlushTrigger,
    pub batch_size: usize,
    pub latency: Duration,
    pub status: u16,
    pub attempts: u32,
    pub delivered: bool,
}

/// Serializes batches and POSTs them to the configured endpoint.
#[derive(Clone)]
pub struct DeliveryClient {
    endpoint: String,
    batch_interval: Duration,
    retry_limit: u32,
    retry_sleep_interval: Duration,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl DeliveryClient {
    pub fn new(
        config: &ForwarderConfig,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            batch_interval: config.batch_interval,
            retry_limit: config.retry_limit,
            retry_sleep_interval: config.retry_sleep_interval,
            transport,
            cancel,
        }
    }

    /// Deliver `batch` and report the result.
    ///
    /// Empty batches are ignored and return `None`. Failures go to `errors`
    /// wrapped as `RetriesExhausted`, or as `Cancelled` when the token fired.
    pub async fn forward_events<R: Serialize>(
        &self,
        batch: &[R],
        trigger: FlushTrigger,
        errors: &ErrorSink,
    ) -> Option<DeliveryReport> {
        // Deadline reached with nothing accumulated.
        if batch.is_empty() {
            return None;
        }

        if trigger == FlushTrigger::Interval {
            info!(
                flush_ms = millis(self.batch_interval),
                "batch interval"
            );
        }

        let started = Instant::now();
        let DeliveryOutcome {
            status,
            error,
            attempts,
        } = self.forward_with_retries(batch).await;
        let latency = started.elapsed();
        let batch_size = batch.len();

        let delivered = match error {
            None => {
                info!(
                    latency_ms = millis(latency),
                    http_status_code = status,
                    batch_size,
                    attempts,
                    trigger = trigger.as_str(),
                    "webhook request success"
                );
                true
            }
            Some(DeliveryError::Cancelled) => {
                report_failure(errors, ForwarderError::Cancelled { batch_size });
                false
            }
            Some(source) => {
                report_failure(
                    errors,
                    ForwarderError::RetriesExhausted {
                        status,
                        batch_size,
                        source,
                    },
                );
                false
            }
        };

        Some(DeliveryReport {
            trigger,
            batch_size,
            latency,
            status,
            attempts,
            delivered,
        })
    }

    /// Run the attempt sequence for one batch.
    ///
    /// 1. Serialize the batch to a JSON array (fatal on failure)
    /// 2. Build the POST request (fatal on failure)
    /// 3. Attempt up to `retry_limit + 1` times, sleeping
    ///    `retry_sleep_interval` before every attempt but the first
    /// 4. Stop at the first 2xx; otherwise return the last status and error
    pub async fn forward_with_retries<R: Serialize>(&self, batch: &[R]) -> DeliveryOutcome {
        // Retrying won't help with a body that cannot be marshaled.
        let body = match serde_json::to_vec(batch) {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::failed(0, DeliveryError::Serialization(e), 0),
        };

        if self.cancel.is_cancelled() {
            return DeliveryOutcome::failed(0, DeliveryError::Cancelled, 0);
        }

        // Nor with a URL that does not parse.
        let request = match OutboundRequest::post(&self.endpoint, body) {
            Ok(request) => request,
            Err(e) => return DeliveryOutcome::failed(0, e, 0),
        };

        let max_attempts = self.retry_limit.saturating_add(1);
        let mut attempts: u32 = 0;
        let mut last_status: u16 = 0;
        let mut last_error = DeliveryError::Cancelled;

        while attempts < max_attempts {
            if attempts > 0 {
                info!(
                    retry = attempts,
                    sleep_interval_ms = millis(self.retry_sleep_interval),
                    error = %last_error,
                    "post err"
                );
                if !self.pause_before_retry().await {
                    return DeliveryOutcome::failed(last_status, DeliveryError::Cancelled, attempts);
                }
            }

            if self.cancel.is_cancelled() {
                return DeliveryOutcome::failed(last_status, DeliveryError::Cancelled, attempts);
            }

            attempts += 1;
            match self.transport.send(&request).await {
                Ok(status) if (200..300).contains(&status) => {
                    return DeliveryOutcome {
                        status,
                        error: None,
                        attempts,
                    };
                }
                Ok(status) => {
                    debug!(status, attempt = attempts, "Webhook returned non-2xx status");
                    last_status = status;
                    last_error = DeliveryError::UnexpectedStatus(status);
                }
                Err(e) if e.is_retryable() => {
                    debug!(error = %e, attempt = attempts, "Webhook transport failure");
                    last_error = e;
                }
                Err(e) => return DeliveryOutcome::failed(last_status, e, attempts),
            }
        }

        DeliveryOutcome::failed(last_status, last_error, attempts)
    }

    /// Sleep the fixed retry interval. Returns false if cancelled meanwhile.
    async fn pause_before_retry(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.retry_sleep_interval) => true,
        }
    }
}

/// Hand a terminal failure to the error sink without waiting on it.
pub(crate) fn report_failure(errors: &ErrorSink, err: ForwarderError) {
    warn!(error = %err, "Batch delivery failed");
    match errors.try_send(err) {
        Ok(()) => {}
        Err(TrySendError::Full(err)) => {
            error!(error = %err, "Error sink full, dropping failure report");
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Error sink closed, failure report discarded");
        }
    }
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_labels() {
        assert_eq!(FlushTrigger::Size.as_str(), "size");
        assert_eq!(FlushTrigger::Interval.as_str(), "interval");
        assert_eq!(FlushTrigger::Drain.as_str(), "drain");
    }

    #[test]
    fn test_outcome_success_flag() {
        let ok = DeliveryOutcome {
            status: 204,
            error: None,
            attempts: 1,
        };
        assert!(ok.is_success());

        let failed = DeliveryOutcome::failed(500, DeliveryError::UnexpectedStatus(500), 4);
        assert!(!failed.is_success());
        assert_eq!(failed.status, 500);
    }

    #[test]
    fn test_report_failure_never_blocks_on_full_sink() {
        let (tx, mut rx) = mpsc::channel(1);
        report_failure(&tx, ForwarderError::Cancelled { batch_size: 1 });
        report_failure(&tx, ForwarderError::Cancelled { batch_size: 2 });

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, ForwarderError::Cancelled { batch_size: 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_report_failure_tolerates_closed_sink() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        report_failure(&tx, ForwarderError::Cancelled { batch_size: 1 });
    }
}
