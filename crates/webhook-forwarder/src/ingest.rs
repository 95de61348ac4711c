//! Newline-delimited JSON record source used by the binary.
//!
//! Stdin is read on a dedicated OS thread, so an idle stdin never keeps the
//! process alive after Ctrl-C.

use crate::error::ForwarderResult;
use futures_util::{stream, Stream};
use serde_json::Value;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Parse one input line. Blank lines yield `None`.
pub fn parse_record(line: &str) -> ForwarderResult<Option<Value>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

/// Read records line by line from `reader` into `records`, blocking.
///
/// Malformed lines are logged and skipped. Stops at EOF, on the first read
/// error, or once the receiving side is gone. Returns the number of records
/// handed over. Must not be called from inside the async runtime.
pub fn read_json_lines<Rd: BufRead>(reader: Rd, records: &mpsc::Sender<Value>) -> u64 {
    let mut sent: u64 = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(line = line_no, error = %e, "Failed to read input");
                break;
            }
        };

        match parse_record(&line) {
            Ok(Some(record)) => {
                if records.blocking_send(record).is_err() {
                    debug!(line = line_no, "Record receiver closed, stopping input");
                    break;
                }
                sent += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(line = line_no, error = %e, "Skipping malformed record"),
        }
    }

    sent
}

/// Start a thread reading stdin and return the receiving end.
///
/// At most `capacity` parsed records wait in the channel; beyond that the
/// thread blocks, which pauses reading stdin.
pub fn spawn_stdin_reader(capacity: usize) -> ForwarderResult<mpsc::Receiver<Value>> {
    let (tx, rx) = mpsc::channel(capacity);

    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let sent = read_json_lines(std::io::stdin().lock(), &tx);
            debug!(records = sent, "Stdin reader finished");
        })?;

    Ok(rx)
}

/// Adapt a channel receiver into a record stream ending when all senders
/// are gone.
pub fn receiver_stream<R>(rx: mpsc::Receiver<R>) -> impl Stream<Item = R> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|r| (r, rx)) })
}
