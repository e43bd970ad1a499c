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

//! The operations-executor command set: every mutation of the connection
//! and delegate maps flows through one of these variants over the
//! facade's bounded `mpsc` channel, the same single-writer-task shape
//! `networking::p2p`'s event loop uses for its swarm state.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::codec::Message;

use super::delegate::{Delegate, TransportError};
use super::endpoint::Endpoint;

/// One request to the operations executor. `reply` channels are present
/// wherever the caller needs to observe the outcome; fire-and-forget
/// commands (`Inbound`, background-task completions) omit them.
pub enum Command {
    /// Send `message` to `endpoint`, registering `delegate` to receive
    /// the eventual reply (or every notification, if `message` carries a
    /// fresh Observe option).
    Send {
        message: Message,
        endpoint: Endpoint,
        delegate: Option<Arc<dyn Delegate>>,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    /// Issues the next message id for `endpoint`, creating its
    /// connection record in `Setup` if this is the first call.
    NextMessageId {
        endpoint: Endpoint,
        reply: oneshot::Sender<u16>,
    },
    /// Drops one `(token, endpoint)` delegate registration without
    /// tearing down the connection.
    CancelTransmission { endpoint: Endpoint, token: crate::codec::Token },
    /// Tears down `endpoint`'s connection: aborts its background tasks,
    /// evicts it and all of its delegates.
    CancelConnection { endpoint: Endpoint },
    /// Tears down every connection.
    CloseAll { reply: oneshot::Sender<()> },
    /// A raw datagram arrived on `endpoint`'s socket.
    Inbound { endpoint: Endpoint, bytes: Vec<u8> },
    /// `endpoint`'s socket connect attempt resolved.
    SocketReady { endpoint: Endpoint, socket: Arc<super::socket::Socket> },
    /// `endpoint`'s socket connect attempt failed (pre-`Ready`).
    SocketFailed { endpoint: Endpoint, error: String },
    /// `endpoint`'s socket read failed after the connection reached
    /// `Ready`; distinct from [`Command::SocketFailed`] so the executor
    /// reports `SocketIo` rather than `Setup` to its delegates.
    SocketIoFailed { endpoint: Endpoint, error: String },
    /// The 2s setup timer fired before `endpoint` reached `Ready`.
    SetupTimeout { endpoint: Endpoint },
    /// The keepalive timer for `endpoint` fired; decide probe/ping/kill.
    KeepaliveTick { endpoint: Endpoint },
}
