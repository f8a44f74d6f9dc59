//! Tests for the in-memory connection pair and the recording writer.

use std::time::Duration;

use courier_core::protocol::{UserJoin, UserLeft};
use courier_core::{Envelope, JsonCodec};
use courier_test::{memory_pair, RecordingWriter, TestError};
use courier_ws::{Connection, ConnectionWriter, Message};

#[tokio::test]
async fn test_peer_messages_reach_reader() {
    let (connection, client) = memory_pair();
    let (mut reader, _writer) = connection.into_split();

    client.send("lobby", &UserJoin { id: "ann".into() }).unwrap();
    let raw = reader.read_message().await.unwrap();
    let envelope = Envelope::decode(&JsonCodec, &raw).unwrap();
    assert_eq!(envelope.channel, "lobby");
    assert_eq!(envelope.name, "edd:user:join");

    client.close();
    let err = reader.read_message().await.unwrap_err();
    assert!(err.is_closed());
}

#[tokio::test]
async fn test_writer_messages_reach_peer() {
    let (connection, client) = memory_pair();
    let (_reader, writer) = connection.into_split();

    let envelope = Envelope::new("lobby", "edd:user:left", serde_json::json!({"id": "ann"}));
    let bytes = envelope.encode(&JsonCodec).unwrap();
    writer.write_message(Message::data(bytes, false).unwrap()).await.unwrap();

    let left: UserLeft = client.expect_event("lobby").await.unwrap();
    assert_eq!(left.id, "ann");

    writer.close().await.unwrap();
    writer.close().await.unwrap();
    assert!(matches!(client.recv().await, Err(TestError::Closed)));
    assert!(writer.write_message(Message::text("late")).await.is_err());
}

#[tokio::test]
async fn test_recv_times_out() {
    let (_connection, client) = memory_pair();
    let client = client.with_timeout(Duration::from_millis(20));
    assert!(matches!(client.recv().await, Err(TestError::Timeout(_))));
}

#[tokio::test]
async fn test_recording_writer_decodes_events() {
    let writer = RecordingWriter::new();
    let envelope = Envelope::new("lobby", "edd:user:join", serde_json::json!({"id": "bob"}));
    writer
        .write_message(Message::data(envelope.encode(&JsonCodec).unwrap(), false).unwrap())
        .await
        .unwrap();
    writer
        .write_message(Message::data(Envelope::error("oops").encode(&JsonCodec).unwrap(), false).unwrap())
        .await
        .unwrap();

    assert!(writer.has_event(&UserJoin { id: "bob".into() }));
    assert!(!writer.has_event(&UserJoin { id: "ann".into() }));
    assert_eq!(writer.count::<UserJoin>(), 1);
    assert_eq!(writer.errors(), vec!["oops".to_string()]);
    assert_eq!(writer.recorded().len(), 2);

    writer.clear();
    assert!(writer.recorded().is_empty());
}
