//! Minimal JSON-over-HTTP/1.1 client.
//!
//! Every REST adapter goes through [`request_json`]: plain `TcpStream`,
//! hyper http1 handshake with the connection driven on a background task,
//! and an explicit per-request deadline.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url `{0}`")]
    InvalidUrl(String),

    #[error("connection to {0} failed: {1}")]
    Connect(String, String),

    #[error("request to {0} failed: {1}")]
    Request(String, String),

    #[error("request to {0} timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response body from {0}: {1}")]
    MalformedBody(String, String),
}

/// Issue a JSON request and parse the JSON response body.
///
/// Non-2xx responses are an error carrying the response text. An empty
/// 2xx body parses as JSON `null`.
pub async fn request_json(
    method: Method,
    url: &str,
    body: Option<&serde_json::Value>,
    timeout: Duration,
) -> Result<serde_json::Value, HttpError> {
    let uri: Uri = url
        .parse()
        .map_err(|_| HttpError::InvalidUrl(url.to_string()))?;
    let host = uri
        .host()
        .ok_or_else(|| HttpError::InvalidUrl(url.to_string()))?
        .to_string();
    let port = uri.port_u16().unwrap_or(80);
    let address = format!("{host}:{port}");
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    tokio::time::timeout(timeout, async {
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|e| HttpError::Connect(url.to_string(), e.to_string()))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| HttpError::Connect(url.to_string(), e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let payload = match body {
            Some(value) => Bytes::from(value.to_string()),
            None => Bytes::new(),
        };
        let req = Request::builder()
            .method(method)
            .uri(&path)
            .header("host", &host)
            .header("content-type", "application/json")
            .header("user-agent", "capstan/0.1")
            .body(Full::new(payload))
            .map_err(|e| HttpError::Request(url.to_string(), e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| HttpError::Request(url.to_string(), e.to_string()))?;

        let status = resp.status();
        let collected = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| HttpError::MalformedBody(url.to_string(), e.to_string()))?;
        let text = String::from_utf8_lossy(&collected.to_bytes()).to_string();

        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(%url, status = status.as_u16(), "request completed");

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| HttpError::MalformedBody(url.to_string(), e.to_string()))
    })
    .await
    .map_err(|_| HttpError::Timeout(url.to_string(), timeout))?
}
