// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client dialed fresh over a Unix domain socket.
//!
//! Mirrors the house style used elsewhere for Unix-socket RPC: no
//! connection pooling, no HTTP library — a request is a string written to a
//! freshly-dialed stream, and the response is parsed by hand. A new dialer
//! is opened per call (spec.md §5: "prefer constructing dialers that open
//! Unix connections on each call").

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("dial {socket} failed: {source}")]
    Dial { socket: String, source: std::io::Error },

    #[error("request to {socket} timed out")]
    Timeout { socket: String },

    #[error("io error talking to {socket}: {source}")]
    Io { socket: String, source: std::io::Error },

    #[error("malformed response from {socket}: {reason}")]
    Malformed { socket: String, reason: String },

    #[error("{socket} responded {status}: {body}")]
    Status { socket: String, status: u16, body: String },
}

/// A parsed HTTP response with a successful (2xx) status.
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One request header, as a literal `(name, value)` pair.
pub type Header<'a> = (&'a str, &'a str);

pub async fn get(socket: &Path, path: &str, headers: &[Header<'_>]) -> Result<HttpResponse, HttpError> {
    request(socket, "GET", path, headers, None).await
}

pub async fn post(
    socket: &Path,
    path: &str,
    headers: &[Header<'_>],
    body: &[u8],
) -> Result<HttpResponse, HttpError> {
    request(socket, "POST", path, headers, Some(body)).await
}

pub async fn delete(socket: &Path, path: &str, headers: &[Header<'_>]) -> Result<HttpResponse, HttpError> {
    request(socket, "DELETE", path, headers, None).await
}

async fn request(
    socket: &Path,
    method: &str,
    path: &str,
    headers: &[Header<'_>],
    body: Option<&[u8]>,
) -> Result<HttpResponse, HttpError> {
    let socket_str = socket.display().to_string();
    tokio::time::timeout(DEFAULT_TIMEOUT, send_request(socket, method, path, headers, body))
        .await
        .map_err(|_| HttpError::Timeout { socket: socket_str.clone() })?
}

async fn send_request(
    socket: &Path,
    method: &str,
    path: &str,
    headers: &[Header<'_>],
    body: Option<&[u8]>,
) -> Result<HttpResponse, HttpError> {
    let socket_str = socket.display().to_string();
    let mut stream = UnixStream::connect(socket)
        .await
        .map_err(|source| HttpError::Dial { socket: socket_str.clone(), source })?;

    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: unix\r\nConnection: close\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some(body) = body {
        request.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    } else {
        request.push_str("\r\n");
    }

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|source| HttpError::Io { socket: socket_str.clone(), source })?;
    if let Some(body) = body {
        stream
            .write_all(body)
            .await
            .map_err(|source| HttpError::Io { socket: socket_str.clone(), source })?;
    }

    let mut reader = BufReader::new(stream);
    read_http_response(&mut reader, &socket_str).await
}

async fn read_http_response<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    socket_str: &str,
) -> Result<HttpResponse, HttpError> {
    let mut header_buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader
            .read(&mut byte)
            .await
            .map_err(|source| HttpError::Io { socket: socket_str.to_string(), source })?;
        if n == 0 {
            return Err(HttpError::Malformed {
                socket: socket_str.to_string(),
                reason: "connection closed before headers finished".to_string(),
            });
        }
        header_buf.push(byte[0]);
        if header_buf.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let header_text = String::from_utf8_lossy(&header_buf);
    let mut lines = header_text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status(status_line, socket_str)?;

    let mut content_length: usize = 0;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader
            .read_exact(&mut body)
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::UnexpectedEof => HttpError::Malformed {
                    socket: socket_str.to_string(),
                    reason: "body shorter than Content-Length".to_string(),
                },
                _ => HttpError::Io { socket: socket_str.to_string(), source },
            })?;
    }

    if !(200..300).contains(&status) {
        return Err(HttpError::Status {
            socket: socket_str.to_string(),
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    Ok(HttpResponse { status, body })
}

fn parse_status(status_line: &str, socket_str: &str) -> Result<u16, HttpError> {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| HttpError::Malformed {
            socket: socket_str.to_string(),
            reason: format!("bad status line: {status_line:?}"),
        })
}

#[cfg(test)]
#[path = "http_client_tests.rs"]
mod tests;
