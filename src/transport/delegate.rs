// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! The delegate callback interface any host of this crate implements, and
//! the [`TransportError`] taxonomy delivered through it.

use thiserror::Error;

use super::endpoint::Endpoint;
use crate::codec::{DecodeError, EncodeError};

/// Errors the core reports to a [`Delegate`]. Never bubbles past the
/// delegate boundary — the core either retries internally (reconnect on
/// the next `send`) or surfaces the fault here.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// The connection did not reach `Ready` within the setup timeout.
    #[error("connection setup failed: {0}")]
    Setup(String),
    /// The socket reported a write failure.
    #[error("send failed: {0}")]
    Send(String),
    /// The message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Keepalive detected `3P` of silence from the peer.
    #[error("ping timeout")]
    PingTimeout,
    /// An inbound read returned a non-cancellation I/O error.
    #[error("socket I/O error: {0}")]
    SocketIo(String),
}

impl From<EncodeError> for TransportError {
    fn from(e: EncodeError) -> Self {
        TransportError::Encode(e.to_string())
    }
}

/// A conversion kept for callers that decode before constructing a
/// delegate-facing error (the router never surfaces `DecodeError`
/// directly — malformed inbound datagrams are silently dropped — but
/// callers composing their own codecs on top of this crate may want it).
impl From<DecodeError> for TransportError {
    fn from(e: DecodeError) -> Self {
        TransportError::SocketIo(e.to_string())
    }
}

/// Callback interface a host of this transport implements to receive
/// inbound data and faults. `did_receive_data_host_port` is a convenience
/// default that forwards to the canonical endpoint form.
pub trait Delegate: Send + Sync {
    /// Raw decoded datagram bytes, and the endpoint they arrived from.
    fn did_receive_data(&self, raw_bytes: &[u8], endpoint: &Endpoint);

    /// Convenience overload taking host+port instead of an [`Endpoint`].
    fn did_receive_data_host_port(&self, raw_bytes: &[u8], host: &str, port: u16) {
        self.did_receive_data(raw_bytes, &Endpoint::from_host_port(host, port));
    }

    /// Reports a fault that could not be resolved internally.
    fn did_fail(&self, error: TransportError);
}
