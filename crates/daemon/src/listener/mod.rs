// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling controller connections.
//!
//! The Listener runs in a spawned task, accepting connections and handling
//! each on its own task. Requests go straight to the executor; `Run` starts
//! the job on a further task and answers immediately.

use std::sync::Arc;
use std::time::Duration;

use rn_core::RunnerState;
use rn_engine::{JobExecutor, MetricsCollector, RunError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::env::PROTOCOL_VERSION;
use crate::protocol::{self, Request, Response};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub executor: Arc<JobExecutor>,
    pub metrics: Arc<dyn MetricsCollector>,
    /// Notified by a `Shutdown` request
    pub shutdown: Arc<Notify>,
    /// When set, connections must open with a Hello carrying this token.
    pub auth_token: Option<String>,
    pub ipc_timeout: Duration,
}

/// Listener task for accepting TCP connections.
pub struct Listener {
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Unauthorized connection")]
    Unauthorized,
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { tcp, ctx }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.tcp.accept().await {
                Ok((stream, addr)) => {
                    debug!("TCP connection from {}", addr);
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("TCP accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected")
        }
        ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
            warn!("Connection timeout")
        }
        ConnectionError::Unauthorized => warn!("Rejected unauthorized connection"),
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// One request, one response. A connection may open with `Hello`, in which
/// case the handshake is answered and one further request is served. With an
/// auth token configured the opening `Hello` is mandatory.
///
/// Generic over reader/writer types so tests can drive it over in-memory pipes.
pub async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let timeout = ctx.ipc_timeout;
    let mut request = protocol::read_request(&mut reader, timeout).await?;

    if let Request::Hello { ref token, ref version } = request {
        if let Some(expected) = &ctx.auth_token {
            if token.as_deref() != Some(expected.as_str()) {
                let response = Response::error("unauthorized");
                let _ = protocol::write_response(&mut writer, &response, timeout).await;
                return Err(ConnectionError::Unauthorized);
            }
        }
        debug!(client_version = %version, "hello");
        let response = Response::Hello { version: PROTOCOL_VERSION.to_string() };
        protocol::write_response(&mut writer, &response, timeout).await?;

        request = match protocol::read_request(&mut reader, timeout).await {
            Ok(request) => request,
            // Handshake-only connection
            Err(protocol::ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
    } else if ctx.auth_token.is_some() {
        let response = Response::error("unauthorized");
        let _ = protocol::write_response(&mut writer, &response, timeout).await;
        return Err(ConnectionError::Unauthorized);
    }

    // Polls are frequent; log them at debug level
    if request.is_poll() {
        debug!(request = ?request, "received request");
    } else {
        info!(request = %request_name(&request), "received request");
    }

    let response = handle_request(request, ctx);
    log_response(&response);
    protocol::write_response(&mut writer, &response, timeout).await?;
    Ok(())
}

/// Handle a single request and return a response.
fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { .. } => Response::Hello { version: PROTOCOL_VERSION.to_string() },

        Request::Submit { body } => match ctx.executor.set_job(*body) {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e),
        },

        Request::SetCodePath { path } => match ctx.executor.set_code_path(path) {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e),
        },

        Request::Run => handle_run(ctx),

        Request::Pull { cursor } => Response::History(ctx.executor.history(cursor)),

        Request::Stop => {
            ctx.executor.stop();
            Response::Ok
        }

        Request::Metrics => match ctx.metrics.system_metrics() {
            Ok(metrics) => Response::Metrics(metrics),
            Err(e) => Response::error(e),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

/// Start the job in the background. Wrong-phase requests are answered with
/// the executor's state error instead.
fn handle_run(ctx: &ListenCtx) -> Response {
    let state = ctx.executor.runner_state();
    if state != RunnerState::WaitingForRun {
        return Response::error(RunError::InvalidState { action: "run", state });
    }
    let executor = Arc::clone(&ctx.executor);
    tokio::spawn(async move {
        if let Err(e) = executor.run().await {
            debug!(error = %e, "run finished with error");
        }
    });
    Response::Ok
}

/// Log the response kind and sizes, never the payload.
fn log_response(response: &Response) {
    match response {
        Response::History(history) => debug!(
            job_states = history.job_states.len(),
            job_logs = history.job_logs.len(),
            runner_logs = history.runner_logs.len(),
            last_updated = history.last_updated,
            has_more = history.has_more,
            "sending history"
        ),
        Response::Error { message } => debug!(%message, "sending error"),
        other => debug!(response = response_name(other), "sending response"),
    }
}

fn response_name(response: &Response) -> &'static str {
    match response {
        Response::Ok => "ok",
        Response::Pong => "pong",
        Response::Hello { .. } => "hello",
        Response::History(_) => "history",
        Response::Metrics(_) => "metrics",
        Response::ShuttingDown => "shutting_down",
        Response::Error { .. } => "error",
    }
}

/// Request kind without its payload; submissions carry secrets.
fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Ping => "ping",
        Request::Hello { .. } => "hello",
        Request::Submit { .. } => "submit",
        Request::SetCodePath { .. } => "set_code_path",
        Request::Run => "run",
        Request::Pull { .. } => "pull",
        Request::Stop => "stop",
        Request::Metrics => "metrics",
        Request::Shutdown => "shutdown",
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
