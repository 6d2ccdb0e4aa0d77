// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed JSON framing.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Request, Response};

/// Largest accepted frame. Pull responses carry whole job logs.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Errors from protocol framing and encoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON body of a message, without the length prefix.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed frame.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one length-prefixed frame.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: data.len(), max: MAX_MESSAGE_SIZE });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_timed<R, T>(reader: &mut R, timeout: Duration) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

async fn write_timed<W, T>(writer: &mut W, message: &T, timeout: Duration) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode(message)?;
    tokio::time::timeout(timeout, write_message(writer, &bytes))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    read_timed(reader, timeout).await
}

pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    write_timed(writer, request, timeout).await
}

pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    read_timed(reader, timeout).await
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    write_timed(writer, response, timeout).await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
