//! Integration tests for the WebSocket session transport.
//!
//! These spin up a real listener on an OS-assigned loopback port and
//! connect to it with [`WebSocketConnection::connect`], so both ends run
//! through the same connection type.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use lanlobby_transport::{
        Connection, ConnectionId, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };

    async fn pair() -> (WebSocketConnection, WebSocketConnection) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let client = WebSocketConnection::connect(addr)
            .await
            .expect("client should connect");
        let server = server.await.expect("accept task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_accept_and_exchange_in_both_directions() {
        let (server, client) = pair().await;

        assert_ne!(server.id(), ConnectionId::HOST);
        assert_ne!(server.id(), client.id());

        server.send(b"hello from host").await.unwrap();
        let got = client.recv().await.unwrap().expect("should have data");
        assert_eq!(got, b"hello from host");

        client.send(b"hello from client").await.unwrap();
        let got = server.recv().await.unwrap().expect("should have data");
        assert_eq!(got, b"hello from client");
    }

    #[tokio::test]
    async fn test_send_is_not_blocked_by_pending_recv() {
        let (server, client) = pair().await;
        let server = Arc::new(server);

        // Park a reader on the host side; nothing has been sent yet.
        let reader = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The write half is independent, so this must complete.
        tokio::time::timeout(Duration::from_secs(1), server.send(b"push"))
            .await
            .expect("send must not wait on the reader")
            .unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), b"push");

        client.send(b"reply").await.unwrap();
        let got = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(got, b"reply");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_peer_close() {
        let (server, client) = pair().await;

        client.close().await.unwrap();

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on peer close");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
            transport.local_addr().unwrap()
        };

        let err = WebSocketConnection::connect(addr).await.err().unwrap();
        assert!(matches!(err, TransportError::ConnectFailed { .. }));
    }

    #[tokio::test]
    async fn test_bind_in_use_port_fails() {
        let first = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let err = WebSocketTransport::bind(&addr).await.err().unwrap();
        assert!(matches!(err, TransportError::BindFailed { .. }));
    }
}
