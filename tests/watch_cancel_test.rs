//! Cancellation safety of the watch loop.

use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use serde_json::json;

use matroid::adapters::mock::{MockTransport, StreamScript, StreamStep};
use matroid::traits::TransportError;

mod common;
use common::{fast_watch_config, mock_client};

fn sse(event: serde_json::Value) -> StreamStep {
    StreamStep::Data(Bytes::from(format!("data: {}\n\n", event)))
}

#[tokio::test]
async fn test_cancel_before_first_connection() {
    let transport = MockTransport::new();
    transport.push_stream_script(StreamScript::ok(vec![StreamStep::Hang]));
    let client = mock_client(&transport, fast_watch_config());

    let mut handle = client.watch_monitoring("m1");
    handle.cancel();

    assert!(handle.next().await.is_none());
    handle.shutdown().await;
    // The producer may or may not have reached the connect; either way it
    // must not connect again.
    assert!(transport.stream_attempts() <= 1);
}

#[tokio::test]
async fn test_cancel_from_another_task_unblocks_next() {
    let transport = MockTransport::new();
    transport.push_stream_script(StreamScript::ok(vec![StreamStep::Hang]));
    let client = mock_client(&transport, fast_watch_config());

    let mut handle = client.watch_monitoring("m1");
    let canceller = handle.canceller();
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    // Blocked on a silent connection until the other task cancels.
    assert!(handle.next().await.is_none());
    cancel.await.unwrap();
    handle.shutdown().await;
}

#[tokio::test]
async fn test_cancel_discards_buffered_events() {
    let transport = MockTransport::new();
    transport.push_stream_script(StreamScript::ok(vec![
        sse(json!({"seq": 1})),
        sse(json!({"seq": 2})),
        StreamStep::Hang,
    ]));
    let client = mock_client(&transport, fast_watch_config());

    let mut handle = client.watch_monitoring("m1");
    // Let the producer run and buffer both events without pulling any.
    tokio::time::sleep(Duration::from_millis(20)).await;

    handle.cancel();
    assert!(handle.next().await.is_none());
    handle.shutdown().await;
}

#[tokio::test]
async fn test_drop_stops_the_producer() {
    let transport = MockTransport::new();
    transport.push_stream_script(StreamScript::ok(vec![
        StreamStep::Fault(TransportError::Io("reset".to_string())),
    ]));
    transport.push_stream_script(StreamScript::ok(vec![StreamStep::Hang]));
    let client = mock_client(&transport, fast_watch_config());

    let handle = client.watch_monitoring("m1");
    tokio::time::sleep(Duration::from_millis(5)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = transport.stream_attempts();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.stream_attempts(), settled);
}

/// Randomized cancel timing against a reconnecting watch.
///
/// Each trial races a cancel against a loop that is refusing, connecting
/// with a delay, and streaming. After `shutdown` returns, the connection
/// count must be final: a cancel landing mid-backoff or mid-connect must
/// never be followed by another connection attempt.
#[tokio::test]
async fn test_cancel_race_never_reconnects_after_shutdown() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let transport = MockTransport::new();
        transport.push_stream_script(StreamScript::ConnectError(
            TransportError::ConnectionFailed("refused".to_string()),
        ));
        transport.push_stream_script(StreamScript::Connect {
            status: 200,
            steps: vec![sse(json!({"seq": 1})), StreamStep::Hang],
            connect_delay: Duration::from_millis(rng.gen_range(0..3)),
        });
        // Spares, in case the scripted connection is torn down mid-race.
        for _ in 0..4 {
            transport.push_stream_script(StreamScript::ok(vec![StreamStep::Hang]));
        }
        let client = mock_client(&transport, fast_watch_config());

        let mut handle = client.watch_monitoring("m1");
        let pulls = rng.gen_range(0..2);
        let delay = Duration::from_micros(rng.gen_range(0..10_000));

        let puller = async {
            for _ in 0..pulls {
                if handle.next().await.is_none() {
                    break;
                }
            }
        };
        tokio::select! {
            _ = puller => {}
            _ = tokio::time::sleep(delay) => {}
        }

        handle.shutdown().await;
        let settled = transport.stream_attempts();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            transport.stream_attempts(),
            settled,
            "connection opened after shutdown returned"
        );
    }
}
