// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 server over a Unix domain socket.
//!
//! This is the server-side counterpart to [`crate::http_client`]: the same
//! hand-rolled-framing house style, generalized to parse an incoming
//! request instead of an outgoing response. Used by the engine socket
//! server (C3) to accept callbacks from children, and by the
//! `fake-applet` test fixture to stand in for a real applet process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// A parsed incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// A response to write back over the socket.
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn status(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: Vec::new() }
    }

    pub fn json(status: u16, value: &impl serde::Serialize) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: body.into().into_bytes() }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A routed HTTP handler. Implementations typically match on
/// `(request.method.as_str(), request.path.as_str())`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Response;
}

/// Accept connections on `listener` until `shutdown` resolves, dispatching
/// each to `handler` on its own task. Mirrors the teacher's
/// accept-then-spawn-per-connection listener loop, generalized from a
/// custom wire format to HTTP/1.1 framing.
pub async fn serve(
    listener: UnixListener,
    handler: Arc<dyn Handler>,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler).await {
                                debug!(error = %e, "engine socket connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "engine socket accept failed");
                    }
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, handler: Arc<dyn Handler>) -> Result<(), HttpServerError> {
    let mut reader = BufReader::new(stream);
    let request = read_request(&mut reader).await?;
    let response = handler.handle(request).await;
    let mut stream = reader.into_inner();
    write_response(&mut stream, &response).await?;
    Ok(())
}

/// Parse a single HTTP/1.1 request off `reader`.
pub async fn read_request<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Request, HttpServerError> {
    let mut header_buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(HttpServerError::Malformed("connection closed before headers finished".into()));
        }
        header_buf.push(byte[0]);
        if header_buf.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let header_text = String::from_utf8_lossy(&header_buf).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| HttpServerError::Malformed("missing request line".into()))?;

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| HttpServerError::Malformed(format!("bad request line: {request_line:?}")))?
        .to_string();
    let target = parts
        .next()
        .ok_or_else(|| HttpServerError::Malformed(format!("bad request line: {request_line:?}")))?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), HashMap::new()),
    };

    let mut headers = HashMap::new();
    let mut content_length = 0usize;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.insert(name, value);
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await?;
    }

    Ok(Request { method, path, query, headers, body })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            Some((urldecode(k), urldecode(v)))
        })
        .collect()
}

/// Minimal `application/x-www-form-urlencoded`-style decoding: `+` and
/// percent-escapes. Query values used by this crate (ids, applet names)
/// never require full RFC 3986 decoding, but `%` escapes are honored since
/// file names may contain spaces.
fn urldecode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '+' => out.push(' '),
            '%' => {
                let hi = chars.next();
                let lo = chars.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                            out.push(byte as char);
                        } else {
                            out.push('%');
                            out.push(hi);
                            out.push(lo);
                        }
                    }
                    _ => out.push('%'),
                }
            }
            other => out.push(other),
        }
    }
    out
}

async fn write_response<W: AsyncWriteExt + Unpin>(writer: &mut W, response: &Response) -> Result<(), HttpServerError> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nConnection: close\r\nContent-Length: {}\r\n",
        response.status,
        reason_phrase(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    writer.write_all(head.as_bytes()).await?;
    if !response.body.is_empty() {
        writer.write_all(&response.body).await?;
    }
    writer.flush().await?;

    if response.status >= 500 {
        warn!(status = response.status, "engine socket handler returned server error");
    }
    Ok(())
}

#[cfg(test)]
#[path = "http_server_tests.rs"]
mod tests;
