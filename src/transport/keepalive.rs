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

//! Peer liveness (C6): a per-peer one-shot timer that re-arms itself
//! through the operations executor, and the pure decision of what the
//! executor should do when one fires.
//!
//! The keepalive period `P` defaults to 1.5s. A peer idle for less than
//! `P` is healthy; idle for `[P, 3P)` gets an empty Confirmable ping to
//! provoke a reply; idle for `3P` or more is declared dead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::clock::Clock;
use super::command::Command;
use super::endpoint::Endpoint;

/// Default keepalive period `P`.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1500);

/// What the executor should do for a peer this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Idle less than `P`: no probe needed.
    Healthy,
    /// Idle in `[P, 3P)`: send an empty CON ping.
    SendProbe,
    /// Idle for `3P` or more: the peer is dead.
    Dead,
}

/// Decides the action for a peer idle since `last_received`, as of `now`.
pub fn evaluate(last_received: Instant, now: Instant, period: Duration) -> KeepaliveAction {
    let idle = now.saturating_duration_since(last_received);
    if idle >= period * 3 {
        KeepaliveAction::Dead
    } else if idle >= period {
        KeepaliveAction::SendProbe
    } else {
        KeepaliveAction::Healthy
    }
}

/// The delay until the next tick after taking `action` this tick, given
/// how long the peer had already been idle (`elapsed`) when this tick
/// fired.
///
/// A probe reschedules to `P + 1s`, giving the peer a full period plus
/// slack to answer before the next check. A healthy peer is re-anchored
/// to `P` after `last_received`, i.e. `P - elapsed`, so the next tick
/// lands on the peer's actual idle deadline instead of drifting later
/// by `elapsed` every time a tick finds the peer healthy.
pub fn next_delay(action: KeepaliveAction, period: Duration, elapsed: Duration) -> Duration {
    match action {
        KeepaliveAction::SendProbe => period + Duration::from_secs(1),
        KeepaliveAction::Healthy => period.saturating_sub(elapsed),
        KeepaliveAction::Dead => period,
    }
}

/// Spawns a one-shot timer that sleeps `delay` then posts a single
/// [`Command::KeepaliveTick`] for `endpoint`. The executor re-arms this
/// after handling the tick; a connection that is cancelled or fails
/// simply never gets a new one spawned, and any in-flight sleep is
/// aborted by `PeerConnection::invalidate_timers`.
pub fn spawn_tick_after(
    endpoint: Endpoint,
    clock: Arc<dyn Clock>,
    delay: Duration,
    tx: mpsc::Sender<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        clock.sleep(delay).await;
        let _ = tx.send(Command::KeepaliveTick { endpoint }).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Duration = Duration::from_millis(1500);

    #[test]
    fn under_one_period_is_healthy() {
        let now = Instant::now();
        let last = now - Duration::from_millis(100);
        assert_eq!(evaluate(last, now, P), KeepaliveAction::Healthy);
    }

    #[test]
    fn between_one_and_three_periods_sends_a_probe() {
        let now = Instant::now();
        let last = now - Duration::from_millis(2000);
        assert_eq!(evaluate(last, now, P), KeepaliveAction::SendProbe);
    }

    #[test]
    fn three_periods_or_more_is_dead() {
        let now = Instant::now();
        let last = now - Duration::from_millis(4500);
        assert_eq!(evaluate(last, now, P), KeepaliveAction::Dead);

        let exactly = now - (P * 3);
        assert_eq!(evaluate(exactly, now, P), KeepaliveAction::Dead);
    }

    #[test]
    fn probe_reschedules_with_one_second_of_slack() {
        let elapsed = Duration::from_millis(2000);
        assert_eq!(next_delay(KeepaliveAction::SendProbe, P, elapsed), P + Duration::from_secs(1));
    }

    #[test]
    fn healthy_reanchors_to_the_original_period_instead_of_drifting() {
        let elapsed = Duration::from_millis(400);
        assert_eq!(next_delay(KeepaliveAction::Healthy, P, elapsed), P - elapsed);
    }

    #[test]
    fn healthy_never_returns_a_negative_delay_if_elapsed_overshoots() {
        let elapsed = P + Duration::from_millis(100);
        assert_eq!(next_delay(KeepaliveAction::Healthy, P, elapsed), Duration::ZERO);
    }

    #[tokio::test]
    async fn tick_fires_exactly_once_after_the_clock_advances() {
        let clock = super::super::clock::test_support::ManualClock::new();
        let (tx, mut rx) = mpsc::channel(4);
        let ep = Endpoint::udp("peer", 5683);

        let handle = spawn_tick_after(ep.clone(), clock.clone(), P, tx);
        clock.advance();
        handle.await.unwrap();

        let cmd = rx.recv().await.expect("expected one tick");
        match cmd {
            Command::KeepaliveTick { endpoint } => assert_eq!(endpoint, ep),
            _ => panic!("unexpected command"),
        }
    }
}
