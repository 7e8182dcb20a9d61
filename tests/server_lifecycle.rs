#![allow(clippy::unwrap_used)]

use action_api::{Server, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn listens_serves_and_stops() {
    let server = Server::builder(ServerConfig::with_port(0)).build().unwrap();
    let running = server.listen_on("127.0.0.1", 0).await.unwrap();
    let addr = running.local_addr();
    assert_ne!(addr.port(), 0);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains(r#"{"status":"ok"}"#));

    running.stop().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
