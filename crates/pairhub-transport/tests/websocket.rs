//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use pairhub_transport::{
        Connection, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept_upgraded(
        transport: &mut WebSocketTransport,
    ) -> WebSocketConnection {
        let pending = transport.accept().await.expect("should accept");
        WebSocketTransport::upgrade(pending)
            .await
            .expect("should upgrade")
    }

    #[tokio::test]
    async fn test_websocket_text_round_trip_between_client_and_server() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(br#"{"type":"waiting"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "utf-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"waiting"}"#);

        client_ws
            .send(Message::Text("hello from client".into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending_does_not_block() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = Arc::new(server_handle.await.unwrap());

        // Park a reader on the connection, then send from another task.
        let reader = Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"ping"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_returns_before_the_upgrade_request_arrives() {
        let (mut transport, addr) = bind().await;

        // A client that opens TCP and never speaks.
        let _silent = TcpStream::connect(addr.as_str()).await.expect("tcp connect");
        let silent = tokio::time::timeout(Duration::from_millis(500), transport.accept())
            .await
            .expect("accept must not wait for the handshake")
            .expect("should accept");

        // A well-behaved client behind it is accepted and upgraded while
        // the silent one is still pending.
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = tokio::time::timeout(Duration::from_secs(1), server_handle)
            .await
            .expect("second client should not wait on the first")
            .unwrap();
        assert_ne!(server_conn.id(), silent.id());

        server_conn.send(b"hi").await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hi");
    }

    #[tokio::test]
    async fn test_upgrade_times_out_a_silent_client() {
        let (mut transport, addr) = bind().await;
        let _silent = TcpStream::connect(addr.as_str()).await.expect("tcp connect");
        let pending = transport.accept().await.expect("should accept");

        let result = tokio::time::timeout(
            Duration::from_secs(7),
            WebSocketTransport::upgrade(pending),
        )
        .await
        .expect("upgrade should give up on its own");

        assert!(matches!(result, Err(TransportError::AcceptFailed(_))));
    }
}
