//! Socket-level failures against raw TCP servers that misbehave on purpose.

use std::net::SocketAddr;
use std::time::Duration;

use modkit_uhr::{ErrorKind, RequestOptions, TransportCode, Uhr, UhrBuilder, UhrConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn test_client() -> Uhr {
    UhrBuilder::with_config(UhrConfig::for_testing())
        .build()
        .unwrap()
}

/// How the server ends the connection after reading the request head.
#[derive(Clone, Copy)]
enum Ending {
    /// RST via zero linger
    Reset,
    /// Orderly close without a response
    Close,
    /// Headers promise more body than is sent, then close
    Truncated,
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn misbehaving_server(ending: Ending) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request_head(&mut stream).await;
        match ending {
            Ending::Reset => {
                #[allow(deprecated)]
                stream.set_linger(Some(Duration::ZERO)).unwrap();
            }
            Ending::Close => {}
            Ending::Truncated => {
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                    .await
                    .unwrap();
                stream.flush().await.unwrap();
            }
        }
        drop(stream);
    });

    addr
}

#[tokio::test]
async fn reset_socket_reports_econnreset() {
    let addr = misbehaving_server(Ending::Reset).await;

    let err = test_client()
        .get(&format!("http://{addr}/reset"), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.code(), Some(TransportCode::ConnectionReset));
    assert_eq!(err.code().unwrap().as_str(), "ECONNRESET");
}

#[tokio::test]
async fn close_before_response_is_reset() {
    let addr = misbehaving_server(Ending::Close).await;

    let err = test_client()
        .get(&format!("http://{addr}/close"), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.code(), Some(TransportCode::ConnectionReset));
}

#[tokio::test]
async fn truncated_body_is_reset() {
    let addr = misbehaving_server(Ending::Truncated).await;

    let err = test_client()
        .post(
            &format!("http://{addr}/truncated"),
            RequestOptions::new().data("payload"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.code(), Some(TransportCode::ConnectionReset));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request_head(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let err = test_client()
        .get(
            &format!("http://{addr}/silent"),
            RequestOptions::new().timeout_ms(100),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
}
