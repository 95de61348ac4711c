//! Webhook forwarder: batches records and POSTs them to one HTTP endpoint.
//!
//! Producers hand records to a [`Relay`]; an [`Accumulator`] groups them
//! into batches by count or elapsed time; a [`DeliveryClient`] serializes
//! each batch as a JSON array and POSTs it with fixed-interval retries.
//!
//! # Delivery Guarantees
//!
//! 1. **Ordered**: batches preserve arrival order, and are sent one at a time
//! 2. **Never Empty**: a flush with nothing buffered sends nothing
//! 3. **Bounded Retries**: at most `retry_limit + 1` attempts per batch
//! 4. **At-Most-Once**: a batch that exhausts its retries is reported on the
//!    error sink and dropped
//!
//! # Architecture
//!
//! ```text
//! Producer -> Relay -> [bounded intake] -> Accumulator -> DeliveryClient -> Webhook
//!                                                               |
//!                                           error sink <--------+
//! ```

pub mod accumulator;
pub mod batch;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod relay;
pub mod transport;

#[cfg(test)]
mod tests;

pub use accumulator::{Accumulator, AccumulatorStats};
pub use config::ForwarderConfig;
pub use delivery::{DeliveryClient, DeliveryOutcome, DeliveryReport, ErrorSink, FlushTrigger};
pub use error::{DeliveryError, ForwarderError, ForwarderResult};
pub use relay::Relay;
pub use transport::{HttpTransport, OutboundRequest, Transport};
