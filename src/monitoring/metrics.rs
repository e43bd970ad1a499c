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
#![warn(missing_docs)]

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus registration failed")]
    Prom,
}

/// Transport-wide Prometheus metrics.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Datagrams written to sockets.
    pub datagrams_sent_total: IntCounter,
    /// Datagrams read from sockets.
    pub datagrams_received_total: IntCounter,
    /// Inbound datagrams dropped for failing to decode.
    pub decode_errors_total: IntCounter,

    /// Auto-generated ACKs sent for known Confirmable messages.
    pub auto_acks_sent_total: IntCounter,
    /// Auto-generated RSTs sent for unmatched Confirmable messages.
    pub auto_resets_sent_total: IntCounter,

    /// Keepalive pings sent after a peer went idle for one period.
    pub keepalive_probes_sent_total: IntCounter,
    /// Peers declared dead after three periods of silence.
    pub keepalive_timeouts_total: IntCounter,

    /// Peer connections currently active.
    pub active_connections: IntGauge,
    /// Delegate registrations currently waiting for a reply.
    pub active_delegates: IntGauge,
}

impl Metrics {
    /// Creates and registers every metric against a fresh [`Registry`].
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let datagrams_sent_total =
            IntCounter::new("coap_transport_datagrams_sent_total", "Datagrams written to sockets")
                .map_err(|_| MetricsError::Prom)?;
        let datagrams_received_total = IntCounter::new(
            "coap_transport_datagrams_received_total",
            "Datagrams read from sockets",
        )
        .map_err(|_| MetricsError::Prom)?;
        let decode_errors_total = IntCounter::new(
            "coap_transport_decode_errors_total",
            "Inbound datagrams dropped for failing to decode",
        )
        .map_err(|_| MetricsError::Prom)?;
        let auto_acks_sent_total = IntCounter::new(
            "coap_transport_auto_acks_sent_total",
            "Empty ACKs auto-generated for known Confirmable messages",
        )
        .map_err(|_| MetricsError::Prom)?;
        let auto_resets_sent_total = IntCounter::new(
            "coap_transport_auto_resets_sent_total",
            "Empty RSTs auto-generated for unmatched Confirmable messages",
        )
        .map_err(|_| MetricsError::Prom)?;
        let keepalive_probes_sent_total = IntCounter::new(
            "coap_transport_keepalive_probes_sent_total",
            "CoAP pings sent to idle peers",
        )
        .map_err(|_| MetricsError::Prom)?;
        let keepalive_timeouts_total = IntCounter::new(
            "coap_transport_keepalive_timeouts_total",
            "Peers declared dead after keepalive silence",
        )
        .map_err(|_| MetricsError::Prom)?;
        let active_connections =
            IntGauge::new("coap_transport_active_connections", "Peer connections currently active")
                .map_err(|_| MetricsError::Prom)?;
        let active_delegates = IntGauge::new(
            "coap_transport_active_delegates",
            "Delegate registrations currently waiting for a reply",
        )
        .map_err(|_| MetricsError::Prom)?;

        for metric in [
            Box::new(datagrams_sent_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(datagrams_received_total.clone()),
            Box::new(decode_errors_total.clone()),
            Box::new(auto_acks_sent_total.clone()),
            Box::new(auto_resets_sent_total.clone()),
            Box::new(keepalive_probes_sent_total.clone()),
            Box::new(keepalive_timeouts_total.clone()),
        ] {
            registry.register(metric).map_err(|_| MetricsError::Prom)?;
        }
        registry.register(Box::new(active_connections.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(active_delegates.clone())).map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            datagrams_sent_total,
            datagrams_received_total,
            decode_errors_total,
            auto_acks_sent_total,
            auto_resets_sent_total,
            keepalive_probes_sent_total,
            keepalive_timeouts_total,
            active_connections,
            active_delegates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_metric_registers_without_name_collisions() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.datagrams_sent_total.get(), 0);
        assert_eq!(metrics.active_connections.get(), 0);
    }
}
