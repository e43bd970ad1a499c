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
#![allow(missing_docs)]

//! The reliable UDP datagram transport: peer connection registry,
//! keepalive liveness, delivery router, and the public [`Transport`]
//! facade that owns the single operations-executor task driving them.

pub mod clock;
pub mod command;
pub mod delegate;
pub mod endpoint;
pub mod facade;
pub mod keepalive;
pub mod registry;
pub mod router;
pub mod socket;

pub use clock::{Clock, SystemClock};
pub use delegate::{Delegate, TransportError};
pub use endpoint::{Endpoint, Protocol};
pub use facade::Transport;
pub use registry::ConnectionState;
pub use socket::{NetworkParameters, Socket, SocketFactory};
