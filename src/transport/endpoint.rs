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

//! [`Endpoint`]: the (host, port, transport) triple identifying a peer.

use std::fmt;
use std::net::SocketAddr;

/// Which wire transport a peer is reached over. `Udp` is the only
/// variant this core implements; kept as an enum (rather than folded
/// away) so `Endpoint` keeps naming the protocol as part of a peer's
/// identity, per its (host, port, transport) triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    /// Plain UDP.
    Udp,
}

/// A CoAP peer: host, port, and the transport protocol reaching it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    /// Hostname or textual IP address.
    pub host: String,
    /// UDP port.
    pub port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl Endpoint {
    /// Builds a plain-UDP endpoint.
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: Protocol::Udp,
        }
    }

    /// Convenience constructor from host+port that forwards to the
    /// canonical `(host, port)` form, mirroring the delegate callback's
    /// `did_receive_data(data, host, port)` convenience overload.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::udp(host, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.protocol {
            Protocol::Udp => "coap",
        };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}

impl TryFrom<&Endpoint> for SocketAddr {
    type Error = std::net::AddrParseError;

    fn try_from(ep: &Endpoint) -> Result<Self, Self::Error> {
        format!("{}:{}", ep.host, ep.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reflects_protocol() {
        assert_eq!(Endpoint::udp("127.0.0.1", 5683).to_string(), "coap://127.0.0.1:5683");
    }

    #[test]
    fn same_host_port_is_equal_and_hashes_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Endpoint::udp("h", 1));
        set.insert(Endpoint::udp("h", 1));
        assert_eq!(set.len(), 1);
    }
}
