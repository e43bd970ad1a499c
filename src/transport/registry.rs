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

//! Per-peer connection records (C5): socket handle, state, last-received
//! timestamp, and the per-peer message-id counter.
//!
//! Every map here is owned exclusively by the operations-executor task in
//! `transport::facade` — nothing in this module takes a lock. A single
//! writer task serializes every mutation, generalizing
//! `networking::peer_score::PeerScore`'s single-owner
//! `BTreeMap<PeerId, PeerState>` to connections instead of scores.

use std::time::Instant;

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;

use super::socket::Socket;
use std::sync::Arc;

/// Lifecycle of one peer connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Just inserted, socket not yet requested.
    Setup,
    /// Socket connect in flight; the 2s setup timer is armed.
    Preparing,
    /// Connected but no keepalive/receive loop started yet (transient).
    Waiting,
    /// Fully operational: keepalive and receive loop running.
    Ready,
    /// Explicitly cancelled by the caller.
    Cancelled,
    /// Torn down after a socket or setup failure.
    Failed,
}

impl ConnectionState {
    /// Cancelled and Failed are both terminal: a subsequent send must
    /// build a fresh socket rather than reuse this record.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Cancelled | ConnectionState::Failed)
    }
}

/// One peer's connection record.
pub struct PeerConnection {
    /// Current state.
    pub state: ConnectionState,
    /// The connected socket, once `Preparing` resolves.
    pub socket: Option<Arc<Socket>>,
    /// Last time any datagram was successfully received from this peer.
    pub last_received: Instant,
    /// Per-peer message-id sequence state; `None` until the first call.
    message_id_state: Option<u16>,
    rng: ChaCha8Rng,
    /// Background receive-loop task, running while `Ready`.
    pub receive_task: Option<JoinHandle<()>>,
    /// Keepalive timer task, running while `Ready`.
    pub keepalive_task: Option<JoinHandle<()>>,
    /// Setup-timeout task, running while `Preparing`.
    pub setup_timer_task: Option<JoinHandle<()>>,
    /// Encoded datagrams queued while the socket is still `Preparing`,
    /// flushed in order once it becomes `Ready`.
    pub pending_sends: Vec<PendingSend>,
}

/// One datagram waiting on a not-yet-ready socket.
pub struct PendingSend {
    /// The already-encoded bytes to write once the socket is ready.
    pub bytes: Vec<u8>,
    /// Fulfilled by the flush, once the write is dispatched or fails.
    pub reply: tokio::sync::oneshot::Sender<Result<(), std::io::Error>>,
}

impl PeerConnection {
    /// A brand-new record in `Setup`, as created by the first send or
    /// receive from a peer.
    pub fn new(now: Instant) -> Self {
        Self {
            state: ConnectionState::Setup,
            socket: None,
            last_received: now,
            message_id_state: None,
            rng: ChaCha8Rng::from_entropy(),
            receive_task: None,
            keepalive_task: None,
            setup_timer_task: None,
            pending_sends: Vec::new(),
        }
    }

    /// Issues the next message id for this peer: the first call draws
    /// uniformly from `0..0xFFFE`; each subsequent call returns
    /// `(prev mod 0xFFFF) + 1`, wrapping at 65535 back to 1 (never 0).
    pub fn next_message_id(&mut self) -> u16 {
        let next = match self.message_id_state {
            None => self.rng.gen_range(0..0xFFFEu32) as u16,
            Some(prev) => (((prev as u32) % 0xFFFF) + 1) as u16,
        };
        self.message_id_state = Some(next);
        next
    }

    /// Every received datagram updates the peer's message-id counter to
    /// the id it carried, so subsequently issued ids continue from the
    /// peer's own sequence.
    pub fn observe_received_message_id(&mut self, id: u16) {
        self.message_id_state = Some(id);
    }

    /// Aborts every background task owned by this record. Called before
    /// the record is evicted from the registry (cancel/fail) so a late
    /// timer fire can never resurrect a dead peer.
    pub fn invalidate_timers(&mut self) {
        if let Some(h) = self.receive_task.take() {
            h.abort();
        }
        if let Some(h) = self.keepalive_task.take() {
            h.abort();
        }
        if let Some(h) = self.setup_timer_task.take() {
            h.abort();
        }
    }
}

impl Drop for PeerConnection {
    fn drop(&mut self) {
        self.invalidate_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_strictly_increasing_mod_65535_and_never_zero() {
        let mut conn = PeerConnection::new(Instant::now());
        let first = conn.next_message_id();
        assert!(first < 0xFFFE);

        let mut prev = first;
        for _ in 0..200_000 {
            let next = conn.next_message_id();
            assert_ne!(next, 0);
            if prev == 0xFFFF {
                assert_eq!(next, 1);
            } else {
                assert_eq!(next, prev + 1);
            }
            prev = next;
        }
    }

    #[test]
    fn wraps_at_65535_back_to_one() {
        let mut conn = PeerConnection::new(Instant::now());
        conn.message_id_state = Some(0xFFFF);
        assert_eq!(conn.next_message_id(), 1);
    }

    #[test]
    fn terminal_states_require_fresh_socket() {
        assert!(ConnectionState::Cancelled.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Ready.is_terminal());
    }
}
