//! Behavior tests for the forwarder.
//!
//! - `harness.rs`      - recording transport, mock webhook server, builders
//! - `size_flush.rs`   - flushing on batch size, ordering across batches
//! - `time_flush.rs`   - flushing on the sliding deadline, determinism
//! - `retry.rs`        - fixed-interval retry bound and short-circuits
//! - `fatal.rs`        - serialization and request construction failures
//! - `shutdown.rs`     - drain on stream close, cancellation
//! - `backpressure.rs` - intake suspension during flushes, error sink sizing
//! - `http.rs`         - real HTTP round trips through reqwest

mod size_flush;
