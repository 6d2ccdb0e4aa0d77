// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal client used by controllers and tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use super::{read_response, write_request, ProtocolError, Request, Response};
use crate::env::PROTOCOL_VERSION;

/// Send one request on a fresh connection and wait for the response.
pub async fn call(
    addr: SocketAddr,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    let mut stream = connect(addr, timeout).await?;
    write_request(&mut stream, request, timeout).await?;
    read_response(&mut stream, timeout).await
}

/// Like [`call`], authenticating with `token` first.
///
/// A rejected Hello is returned as the response.
pub async fn call_with_hello(
    addr: SocketAddr,
    token: Option<&str>,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    let mut stream = connect(addr, timeout).await?;
    let hello = Request::Hello {
        version: PROTOCOL_VERSION.to_string(),
        token: token.map(str::to_string),
    };
    write_request(&mut stream, &hello, timeout).await?;
    match read_response(&mut stream, timeout).await? {
        Response::Hello { .. } => {}
        other => return Ok(other),
    }
    write_request(&mut stream, request, timeout).await?;
    read_response(&mut stream, timeout).await
}

async fn connect(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, ProtocolError> {
    tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ProtocolError::Timeout)?
        .map_err(ProtocolError::from)
}
