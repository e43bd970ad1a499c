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

//! The socket seam: a connected datagram channel to one peer, and the
//! factory that materializes one for an [`Endpoint`].
//!
//! This core ships plain UDP only. A prior revision carried a `dtls`
//! feature that typed itself as DTLS-PSK transport security but never
//! performed a handshake or encrypted the record layer — it just wrapped
//! a connected `UdpSocket` and called the result secure. That was worse
//! than not offering the feature at all, so it was removed rather than
//! fixed in place; a real DTLS-PSK socket (built the way
//! `toad-lib-toad`'s `kwap::std::net::secure::SecureUdpSocket` drives an
//! `openssl::ssl::SslStream` over a `Read`/`Write` adapter on the raw
//! socket) is future work, not a construction-time flag that silently
//! downgrades to plaintext.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::net::UdpSocket;

use super::endpoint::Endpoint;

/// A connected datagram channel to exactly one peer.
pub enum Socket {
    /// Plain UDP.
    Plain(UdpSocket),
}

impl Socket {
    /// Sends one datagram to the connected peer.
    pub async fn send(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Socket::Plain(s) => {
                s.send(bytes).await?;
                Ok(())
            }
        }
    }

    /// Receives one datagram from the connected peer.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Plain(s) => s.recv(buf).await,
        }
    }
}

/// Construction-time network parameters. `Udp` is the only variant this
/// core implements; the type stays a seam (rather than a bare factory
/// function) for a host that wants to supply its own verification or
/// parameters in the future.
#[derive(Clone, Copy, Debug, Default)]
pub enum NetworkParameters {
    /// Plain UDP, no transport security.
    #[default]
    Udp,
}

/// Materializes a connected [`Socket`] for an [`Endpoint`]. The core
/// consumes this as an external collaborator; production code uses
/// [`DefaultSocketFactory`], tests substitute an in-memory factory.
pub trait SocketFactory: Send + Sync + 'static {
    /// Binds and connects a socket to `endpoint`.
    fn connect(&self, endpoint: Endpoint) -> Pin<Box<dyn Future<Output = io::Result<Socket>> + Send>>;
}

/// Builds plain UDP sockets.
pub struct DefaultSocketFactory {
    params: NetworkParameters,
}

impl DefaultSocketFactory {
    /// A factory producing plain UDP sockets.
    pub fn udp() -> Self {
        Self {
            params: NetworkParameters::Udp,
        }
    }

    /// A factory producing sockets per `params`.
    pub fn new(params: NetworkParameters) -> Self {
        Self { params }
    }
}

impl SocketFactory for DefaultSocketFactory {
    fn connect(&self, endpoint: Endpoint) -> Pin<Box<dyn Future<Output = io::Result<Socket>> + Send>> {
        let NetworkParameters::Udp = self.params;
        Box::pin(async move {
            let addr: SocketAddr = (&endpoint)
                .try_into()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e}")))?;
            let local: SocketAddr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }.parse().unwrap();
            let sock = UdpSocket::bind(local).await?;
            sock.connect(addr).await?;
            Ok(Socket::Plain(sock))
        })
    }
}
