//! Configuration for the forwarder.

use crate::error::{ForwarderError, ForwarderResult};
use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
/// Default fixed pause before each retry.
pub const DEFAULT_RETRY_SLEEP_INTERVAL: Duration = Duration::from_secs(2);
/// Default bound of the queue between relay and accumulator.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default size of the error sink channel built by callers.
pub const DEFAULT_ERROR_QUEUE_CAPACITY: usize = 64;
/// Default timeout of a single HTTP attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Forwarder configuration.
///
/// Owned by the [`Relay`](crate::Relay) once constructed and only exposed by
/// shared reference afterwards.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Webhook endpoint receiving the batches
    pub endpoint: String,

    /// Flush once this many records are buffered (0 = never by size)
    pub batch_size: usize,

    /// Flush whatever is buffered after this much time (zero = never by time)
    pub batch_interval: Duration,

    /// Fixed pause before every retry
    pub retry_sleep_interval: Duration,

    /// Retries after the first attempt
    pub retry_limit: u32,

    /// Bound of the intake queue; a full queue suspends the relay
    pub queue_capacity: usize,

    /// Capacity callers should give the error sink channel
    pub error_queue_capacity: usize,

    /// Timeout applied to each HTTP attempt
    pub request_timeout: Duration,
}

impl ForwarderConfig {
    /// Create a config for `endpoint` with both flush triggers disabled.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size: 0,
            batch_interval: Duration::ZERO,
            retry_sleep_interval: DEFAULT_RETRY_SLEEP_INTERVAL,
            retry_limit: DEFAULT_RETRY_LIMIT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            error_queue_capacity: DEFAULT_ERROR_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_interval(mut self, batch_interval: Duration) -> Self {
        self.batch_interval = batch_interval;
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_retry_sleep_interval(mut self, interval: Duration) -> Self {
        self.retry_sleep_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_error_queue_capacity(mut self, capacity: usize) -> Self {
        self.error_queue_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Whether reaching `batch_size` records triggers a flush.
    pub fn size_trigger_enabled(&self) -> bool {
        self.batch_size > 0
    }

    /// Whether the sliding deadline is armed at all.
    pub fn interval_trigger_enabled(&self) -> bool {
        !self.batch_interval.is_zero()
    }

    /// Total HTTP attempts per batch: the first try plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    /// Reject settings the runtime cannot honor.
    ///
    /// An empty endpoint is left to request construction so that it is
    /// reported per batch like any other malformed URL.
    pub fn validate(&self) -> ForwarderResult<()> {
        if self.queue_capacity == 0 {
            return Err(ForwarderError::Config(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        if self.error_queue_capacity == 0 {
            return Err(ForwarderError::Config(
                "error queue capacity must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ForwarderError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ForwarderConfig::new("http://localhost:9000/hook");

        assert_eq!(config.endpoint, "http://localhost:9000/hook");
        assert_eq!(config.batch_size, 0);
        assert_eq!(config.batch_interval, Duration::ZERO);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.retry_sleep_interval, Duration::from_secs(2));
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.error_queue_capacity, 64);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts(), 4);
    }

    #[test]
    fn test_trigger_flags() {
        let config = ForwarderConfig::new("http://localhost/");
        assert!(!config.size_trigger_enabled());
        assert!(!config.interval_trigger_enabled());

        let config = config
            .with_batch_size(10)
            .with_batch_interval(Duration::from_millis(500));
        assert!(config.size_trigger_enabled());
        assert!(config.interval_trigger_enabled());
    }

    #[test]
    fn test_both_triggers_disabled_is_valid() {
        let config = ForwarderConfig::new("http://localhost/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config = ForwarderConfig::new("http://localhost/").with_queue_capacity(0);
        assert!(matches!(config.validate(), Err(ForwarderError::Config(_))));

        let config = ForwarderConfig::new("http://localhost/").with_error_queue_capacity(0);
        assert!(matches!(config.validate(), Err(ForwarderError::Config(_))));
    }

    #[test]
    fn test_max_attempts_saturates() {
        let config = ForwarderConfig::new("http://localhost/").with_retry_limit(u32::MAX);
        assert_eq!(config.max_attempts(), u32::MAX);
    }
}
