//! In-process HTTP stub for exercising the wire protocol without a real
//! endpoint.
//!
//! The stub is deliberately dumb: it serves its queued bodies once each, in
//! order, regardless of method or path, and records every raw request so
//! tests can assert on the protocol. `Connection: close` keeps reqwest from
//! pooling, so each request arrives on a fresh accept.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A running stub server.
pub(crate) struct Stub {
    /// Bound address; build URLs as `http://{addr}/...`.
    pub(crate) addr: SocketAddr,
    /// Raw request text, one entry per served body, in serving order.
    pub(crate) requests: mpsc::UnboundedReceiver<String>,
}

/// Start a stub that answers with each of `bodies` once, as HTTP 200 JSON.
/// The serving task ends after the last body.
pub(crate) async fn serve(bodies: Vec<String>) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for body in bodies {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Stub { addr, requests: rx }
}

/// Read one HTTP request: headers through `\r\n\r\n`, then any body the
/// `content-length` header promises.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let Ok(n) = stream.read(&mut buf).await else {
            break;
        };
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(end) = header_end(&data) {
            let header = String::from_utf8_lossy(&data[..end]);
            let content_length = header
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|window| window == b"\r\n\r\n")
}
