// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller protocol.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! One request and one response per connection, optionally preceded by
//! a Hello exchange.

mod client;
mod request;
mod response;
mod wire;

pub use client::{call, call_with_hello};
pub use request::Request;
pub use response::Response;
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_MESSAGE_SIZE};
pub use wire::{read_request, read_response, write_request, write_response};
