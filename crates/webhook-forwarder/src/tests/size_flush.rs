//! Size-triggered flush tests.

use super::harness::{error_sink, relay_with, RecordingTransport, ENDPOINT};
use crate::accumulator::Accumulator;
use crate::config::ForwarderConfig;
use futures::stream;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

/// Records A,B,C,D with batch size 2 produce [A,B] then [C,D].
#[tokio::test]
async fn scenario_pairs_in_arrival_order() {
    let transport = RecordingTransport::new();
    let relay = relay_with(ForwarderConfig::new(ENDPOINT).with_batch_size(2), &transport);
    let (errors, mut error_rx) = error_sink();

    let records = stream::iter(vec![json!("A"), json!("B"), json!("C"), json!("D")]);
    let stats = relay.forward(records, errors).await.unwrap();

    assert_eq!(
        transport.bodies(),
        vec![json!(["A", "B"]), json!(["C", "D"])]
    );
    assert_eq!(stats.batches_delivered, 2);
    assert_eq!(stats.records_delivered, 4);
    assert!(error_rx.try_recv().is_err());
}

#[tokio::test]
async fn flush_happens_exactly_at_batch_size() {
    let transport = RecordingTransport::new();
    let config = ForwarderConfig::new(ENDPOINT).with_batch_size(3);
    let (tx, rx) = mpsc::channel(16);
    let (errors, _error_rx) = error_sink();
    let client = super::harness::client_with(&config, &transport);
    let handle = tokio::spawn(Accumulator::new(&config, rx, client, errors).run());

    tx.send(json!(1)).await.unwrap();
    tx.send(json!(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.attempt_count(), 0, "Two records must not flush");

    tx.send(json!(3)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.bodies(), vec![json!([1, 2, 3])]);

    // The fourth record starts a new batch.
    tx.send(json!(4)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.attempt_count(), 1);

    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!(transport.bodies(), vec![json!([1, 2, 3]), json!([4])]);
    assert_eq!(stats.batches_delivered, 2);
}

#[tokio::test]
async fn every_record_delivered_once_in_order() {
    let transport = RecordingTransport::new();
    let relay = relay_with(ForwarderConfig::new(ENDPOINT).with_batch_size(4), &transport);
    let (errors, _error_rx) = error_sink();

    let stats = relay
        .forward(stream::iter((0..10).map(|i| json!(i))), errors)
        .await
        .unwrap();

    let flattened: Vec<serde_json::Value> = transport
        .bodies()
        .into_iter()
        .flat_map(|body| body.as_array().cloned().unwrap())
        .collect();
    let expected: Vec<serde_json::Value> = (0..10).map(|i| json!(i)).collect();

    assert_eq!(flattened, expected);
    assert_eq!(
        transport.bodies(),
        vec![json!([0, 1, 2, 3]), json!([4, 5, 6, 7]), json!([8, 9])]
    );
    assert_eq!(stats.records_delivered, 10);
}

#[tokio::test]
async fn batch_of_one_posts_each_record() {
    let transport = RecordingTransport::new();
    let relay = relay_with(ForwarderConfig::new(ENDPOINT).with_batch_size(1), &transport);
    let (errors, _error_rx) = error_sink();

    relay
        .forward(stream::iter(vec![json!({"id": 1}), json!({"id": 2})]), errors)
        .await
        .unwrap();

    assert_eq!(
        transport.bodies(),
        vec![json!([{"id": 1}]), json!([{"id": 2}])]
    );
    assert!(transport
        .attempts()
        .iter()
        .all(|a| a.content_type == "application/json"));
}
