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

//! A client-side CoAP (RFC 7252) transport.
//!
//! This crate provides:
//! - A CoAP message codec: primitive value conversions, the option
//!   registry, message identity, and wire encode/decode ([`codec`])
//! - A reliable UDP datagram transport built around a single
//!   operations-executor task: peer connection registry, keepalive
//!   liveness, delivery routing, and the public [`transport::Transport`]
//!   facade ([`transport`])
//! - TOML/env configuration for both ([`config`])
//! - Prometheus metrics for the transport's send/receive and keepalive
//!   behavior ([`monitoring`])

/// CoAP message codec (primitives, options, message, wire format).
pub mod codec;
/// Transport configuration (TOML + env var overrides).
pub mod config;
/// Observability (Prometheus metrics).
pub mod monitoring;
/// The reliable UDP transport and its operations executor.
pub mod transport;
