//! Socket-level tests for the handshake and frame handling.

use courier_ws::{accept, Connection, Message, WebSocketConfig, WsError};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;

async fn listener() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn test_accept_reads_data_and_writes_back() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept(stream, WebSocketConfig::new().path("/ws")).await.unwrap();
        let (mut reader, writer) = ws.into_split();

        let payload = reader.read_message().await.unwrap();
        assert_eq!(payload, b"hello");
        writer
            .write_message(Message::data(payload, false).unwrap())
            .await
            .unwrap();

        let err = reader.read_message().await.unwrap_err();
        assert!(err.is_closed());
    });

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    client.send(tungstenite::Message::text("hello")).await.unwrap();
    let reply = client.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "hello");

    client.close(None).await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_wrong_path_is_not_found() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        assert!(accept(stream, WebSocketConfig::new().path("/ws")).await.is_err());
    });

    match tokio_tungstenite::connect_async(format!("ws://{addr}/other")).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 404),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("upgrade on the wrong path succeeded"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept(stream, WebSocketConfig::new().max_message_size(4))
            .await
            .unwrap();
        let (mut reader, _writer) = ws.into_split();
        match reader.read_message().await {
            Err(WsError::MessageTooBig { size, max }) => {
                assert_eq!(size, 5);
                assert_eq!(max, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    });

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();
    client.send(tungstenite::Message::text("hello")).await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_writer_close_is_idempotent() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept(stream, WebSocketConfig::default()).await.unwrap();
        let (_reader, writer) = ws.into_split();
        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.write_message(Message::text("late")).await.is_err());
    });

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();
    let frame = client.next().await.unwrap().unwrap();
    assert!(frame.is_close());
    server.await.unwrap();
}
