//! Test doubles: a scripted page source and a local HTTP responder.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::fetch::PageSource;
use rmodels_core::{Entity, Error, Page};

/// Page source answering from a fixed script, indexed by page number.
pub(crate) struct ScriptedSource {
    pages: Vec<Page>,
    fail: bool,
    calls: Mutex<Vec<u64>>,
}

impl ScriptedSource {
    pub(crate) fn new(pages: Vec<Page>) -> Self {
        Self { pages, fail: false, calls: Mutex::new(Vec::new()) }
    }

    /// Source whose every fetch fails like a server error.
    pub(crate) fn failing() -> Self {
        Self { pages: Vec::new(), fail: true, calls: Mutex::new(Vec::new()) }
    }

    /// Requested page numbers, in call order.
    pub(crate) fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, entity: &Entity, page: u64) -> Result<Page, Error> {
        self.calls.lock().unwrap().push(page);
        if self.fail {
            return Err(Error::RemoteUnavailable(format!("access to remote model `{}` failed: status 500", entity.name())));
        }
        let idx = usize::try_from(page.saturating_sub(1)).unwrap();
        self.pages
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::RemoteUnavailable(format!("no scripted page {page}")))
    }
}

/// Page from a JSON literal.
pub(crate) fn page(value: Value) -> Page {
    serde_json::from_value(value).unwrap()
}

/// Serve one canned response per connection, in order.
///
/// The handle resolves to the raw requests received.
pub(crate) async fn respond_sequence(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);

            let response = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });

    (format!("http://{addr}"), handle)
}

/// Serve a single canned response.
pub(crate) async fn respond_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let (base, handle) = respond_sequence(vec![(status, body.to_string())]).await;
    let handle = tokio::spawn(async move { handle.await.unwrap().pop().unwrap_or_default() });
    (base, handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
