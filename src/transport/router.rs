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

//! The delivery router (C7): matches inbound datagrams to waiting
//! delegates by `(token, endpoint)`, auto-ACKs known CONs, auto-RSTs
//! unknown CONs, and retires one-shot delegates once their ACK lands.
//!
//! Every function here is a plain, synchronous transform over the maps
//! the operations executor (`transport::facade`) owns; sending the
//! produced outbound message is the executor's job, kept off this module
//! so the only suspension points in the hot path are socket I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::codec::{self, Message, Token, Type};

use super::delegate::Delegate;
use super::endpoint::Endpoint;
use super::registry::{ConnectionState, PeerConnection};

/// One registered waiter for a `(token, endpoint)` transaction.
pub struct DelegateEntry {
    /// The callback to notify.
    pub delegate: Arc<dyn Delegate>,
    /// Observation delegates are never auto-retired on ACK (RFC 7641).
    pub is_observation: bool,
}

/// The key identifying one outstanding logical transaction.
pub type TransactionId = (Token, Endpoint);

/// What the executor should do after routing one inbound datagram.
#[derive(Default)]
pub struct RouteOutcome {
    /// An empty ACK or RST to send back, if any.
    pub outbound: Option<Message>,
    /// The delegate to hand the raw bytes to, if one was registered.
    pub deliver: Option<Arc<dyn Delegate>>,
}

/// Processes one inbound datagram: decodes it, updates the peer's
/// liveness and message-id state, then matches it against registered
/// delegates. Returns `None` if the bytes do not decode as a CoAP
/// message — malformed datagrams are silently dropped.
pub fn route_inbound(
    raw: &[u8],
    endpoint: &Endpoint,
    connections: &mut HashMap<Endpoint, PeerConnection>,
    delegates: &mut HashMap<TransactionId, DelegateEntry>,
    now: Instant,
) -> Option<RouteOutcome> {
    let decoded = match codec::decode(raw) {
        Ok(m) => m,
        Err(e) => {
            debug!(%endpoint, error = %e, "dropping malformed inbound datagram");
            return None;
        }
    };

    let conn = connections
        .entry(endpoint.clone())
        .or_insert_with(|| PeerConnection::new(now));
    conn.observe_received_message_id(decoded.message_id);
    conn.last_received = now;

    let id: TransactionId = (decoded.token, endpoint.clone());
    let mut outcome = RouteOutcome::default();

    match decoded.mtype {
        Type::Confirmable => {
            if delegates.contains_key(&id) {
                trace!(%endpoint, token = %decoded.token, mid = decoded.message_id, "auto-ACK known CON");
                outcome.outbound = Some(Message::empty_ack(decoded.message_id));
            } else {
                warn!(%endpoint, mid = decoded.message_id, "auto-RST unknown CON");
                outcome.outbound = Some(Message::empty_reset(decoded.message_id));
                return Some(outcome);
            }
        }
        Type::NonConfirmable | Type::Acknowledgement | Type::Reset => {}
    }

    if let Some(entry) = delegates.get(&id) {
        outcome.deliver = Some(entry.delegate.clone());

        let retire = decoded.mtype == Type::Acknowledgement && !entry.is_observation;
        if retire {
            delegates.remove(&id);
        }
    }

    Some(outcome)
}

/// Evicts `endpoint` from both maps — the shared tail of
/// `cancel_connection` and keepalive-timeout handling. Dropping the
/// record invalidates its background timers; `state` is unused beyond
/// that and exists only so callers can log which terminal state drove
/// the eviction.
pub fn evict_peer(
    endpoint: &Endpoint,
    _state: ConnectionState,
    connections: &mut HashMap<Endpoint, PeerConnection>,
    delegates: &mut HashMap<TransactionId, DelegateEntry>,
) {
    connections.remove(endpoint);
    delegates.retain(|(_, ep), _| ep != endpoint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Code;

    fn conn_map() -> HashMap<Endpoint, PeerConnection> {
        HashMap::new()
    }

    struct Recorder {
        received: std::sync::Mutex<Vec<Vec<u8>>>,
    }
    impl Delegate for Recorder {
        fn did_receive_data(&self, raw: &[u8], _endpoint: &Endpoint) {
            self.received.lock().unwrap().push(raw.to_vec());
        }
        fn did_fail(&self, _error: super::super::delegate::TransportError) {}
    }

    #[test]
    fn unknown_con_triggers_exactly_one_rst() {
        let ep = Endpoint::udp("peer", 5683);
        let mut conns = conn_map();
        let mut delegates = HashMap::new();

        let msg = Message::new(Type::Confirmable, Code::GET, 5, Token(0xAABB));
        let raw = codec::encode(&msg).unwrap();

        let outcome = route_inbound(&raw, &ep, &mut conns, &mut delegates, Instant::now()).unwrap();
        let rst = outcome.outbound.expect("expected RST");
        assert_eq!(rst.mtype, Type::Reset);
        assert_eq!(rst.message_id, 5);
        assert_eq!(rst.token, Token(0));
        assert!(outcome.deliver.is_none());
    }

    #[test]
    fn known_con_triggers_ack_and_single_delivery() {
        let ep = Endpoint::udp("peer", 5683);
        let mut conns = conn_map();
        let mut delegates = HashMap::new();
        let token = Token(7);
        let recorder = Arc::new(Recorder { received: Default::default() });
        delegates.insert(
            (token, ep.clone()),
            DelegateEntry { delegate: recorder.clone(), is_observation: false },
        );

        let msg = Message::new(Type::Confirmable, Code::CONTENT, 9, token);
        let raw = codec::encode(&msg).unwrap();
        let outcome = route_inbound(&raw, &ep, &mut conns, &mut delegates, Instant::now()).unwrap();

        let ack = outcome.outbound.expect("expected ACK");
        assert_eq!(ack.mtype, Type::Acknowledgement);
        assert_eq!(ack.message_id, 9);
        assert!(outcome.deliver.is_some());
        // CON does not retire a one-shot; only a delivered ACK does.
        assert!(delegates.contains_key(&(token, ep)));
    }

    #[test]
    fn one_shot_retires_on_ack_but_observation_persists() {
        let ep = Endpoint::udp("peer", 5683);
        let mut conns = conn_map();
        let mut delegates = HashMap::new();
        let one_shot_token = Token(1);
        let obs_token = Token(2);
        let recorder = Arc::new(Recorder { received: Default::default() });
        delegates.insert(
            (one_shot_token, ep.clone()),
            DelegateEntry { delegate: recorder.clone(), is_observation: false },
        );
        delegates.insert(
            (obs_token, ep.clone()),
            DelegateEntry { delegate: recorder.clone(), is_observation: true },
        );

        let ack1 = Message::new(Type::Acknowledgement, Code::CONTENT, 1, one_shot_token);
        route_inbound(&codec::encode(&ack1).unwrap(), &ep, &mut conns, &mut delegates, Instant::now()).unwrap();
        assert!(!delegates.contains_key(&(one_shot_token, ep.clone())));

        let ack2 = Message::new(Type::Acknowledgement, Code::CONTENT, 2, obs_token);
        route_inbound(&codec::encode(&ack2).unwrap(), &ep, &mut conns, &mut delegates, Instant::now()).unwrap();
        assert!(delegates.contains_key(&(obs_token, ep)));
    }

    #[test]
    fn malformed_datagram_is_silently_dropped() {
        let ep = Endpoint::udp("peer", 5683);
        let mut conns = conn_map();
        let mut delegates = HashMap::new();
        assert!(route_inbound(&[0x00], &ep, &mut conns, &mut delegates, Instant::now()).is_none());
    }
}
