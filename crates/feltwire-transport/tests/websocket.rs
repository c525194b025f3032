//! Integration tests for the WebSocket dialer.
//!
//! These spin up a real local WebSocket server and dial it through the
//! public [`Connector`] API, verifying that bytes actually flow both ways
//! and that a server-side close surfaces as `Ok(None)`.

#[cfg(feature = "websocket")]
mod websocket {
    use feltwire_transport::{Connection, Connector, TransportError, WebSocketConnector};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    /// Binds a one-shot echo server on an OS-assigned port and returns its
    /// address. The server echoes every binary frame back and closes after
    /// `echoes` frames.
    async fn spawn_echo_server(echoes: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            for _ in 0..echoes {
                match ws.next().await {
                    Some(Ok(msg @ Message::Binary(_))) => {
                        ws.send(msg).await.expect("echo");
                    }
                    _ => break,
                }
            }
            let _ = ws.close(None).await;
        });
        addr
    }

    #[tokio::test]
    async fn test_dial_send_and_receive() {
        let addr = spawn_echo_server(1).await;
        let conn = WebSocketConnector
            .connect(&format!("ws://{addr}"))
            .await
            .expect("dial");

        assert!(conn.id().into_inner() > 0);

        conn.send(b"\x08\x63").await.expect("send");
        let echoed = conn.recv().await.expect("recv");
        assert_eq!(echoed.as_deref(), Some(&b"\x08\x63"[..]));
    }

    #[tokio::test]
    async fn test_server_close_yields_none() {
        let addr = spawn_echo_server(0).await;
        let conn = WebSocketConnector
            .connect(&format!("ws://{addr}"))
            .await
            .expect("dial");

        // Server closes immediately without echoing anything.
        assert_eq!(conn.recv().await.expect("recv"), None);
    }

    #[tokio::test]
    async fn test_each_dial_gets_a_fresh_id() {
        let addr_a = spawn_echo_server(0).await;
        let addr_b = spawn_echo_server(0).await;
        let a = WebSocketConnector
            .connect(&format!("ws://{addr_a}"))
            .await
            .expect("dial a");
        let b = WebSocketConnector
            .connect(&format!("ws://{addr_b}"))
            .await
            .expect("dial b");
        assert_ne!(a.id(), b.id());
    }

    /// Connections run inside spawned actor tasks, so every trait future
    /// has to be `Send`. This is a compile-time guarantee; the calls just
    /// make it fail loudly here instead of at a distant spawn site.
    #[tokio::test]
    async fn test_trait_futures_are_send() {
        fn send_future<F: std::future::Future + Send>(f: F) -> F {
            f
        }
        fn assert_connection_futures<T: Connection>(conn: &T) {
            drop(send_future(conn.send(&[])));
            drop(send_future(conn.recv()));
            drop(send_future(conn.close()));
        }

        let addr = spawn_echo_server(0).await;
        let conn = send_future(WebSocketConnector.connect(&format!("ws://{addr}")))
            .await
            .expect("dial");
        assert_connection_futures(&conn);
    }

    #[tokio::test]
    async fn test_dial_refused_endpoint_fails() {
        // Nothing listens on this port.
        let err = WebSocketConnector
            .connect("ws://127.0.0.1:1")
            .await
            .err()
            .expect("dial must fail");
        assert!(matches!(err, TransportError::ConnectFailed(_)));
    }
}
