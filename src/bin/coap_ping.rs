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

//! Sends a single CoAP GET to a peer and prints whatever comes back.
//! A thin command-line exercise of the [`coap_transport::transport::Transport`]
//! facade, in the spirit of this crate's old `keygen` binary sitting next
//! to the library it drives.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;

use coap_transport::codec::{Message, Token, Type};
use coap_transport::config::TransportConfig;
use coap_transport::transport::{Delegate, Endpoint, Transport, TransportError};

struct PrintDelegate {
    done: Arc<AtomicBool>,
}

impl Delegate for PrintDelegate {
    fn did_receive_data(&self, raw_bytes: &[u8], endpoint: &Endpoint) {
        info!(%endpoint, bytes = raw_bytes.len(), "reply received");
        println!("{} bytes from {endpoint}: {}", raw_bytes.len(), hex::encode(raw_bytes));
        self.done.store(true, Ordering::SeqCst);
    }

    fn did_fail(&self, error: TransportError) {
        eprintln!("transport error: {error}");
        self.done.store(true, Ordering::SeqCst);
    }
}

fn env_arg(name: &str, index: usize, default: &str) -> String {
    env::args().nth(index).unwrap_or_else(|| env::var(name).unwrap_or_else(|_| default.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_target(false).with_level(true).compact().try_init();

    let host = env_arg("COAP_PING_HOST", 1, "127.0.0.1");
    let port: u16 = env_arg("COAP_PING_PORT", 2, "5683").parse()?;
    let path = env_arg("COAP_PING_PATH", 3, "/");

    let cfg = TransportConfig::from_env();
    info!(%host, port, keepalive_ms = cfg.keepalive_period_ms, "coap-ping starting");

    let transport = Transport::with_config(&cfg)?;
    let endpoint = Endpoint::udp(host, port);
    let mid = transport.next_message_id(endpoint.clone()).await;
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let message = Message::get(Type::Confirmable, mid, Token(1), &segments);

    let done = Arc::new(AtomicBool::new(false));
    let delegate = Arc::new(PrintDelegate { done: done.clone() });

    transport.send(message, endpoint, Some(delegate)).await?;

    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !done.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    transport.close_all().await;

    if waited.is_err() {
        bail!("no reply from {path} within 5s");
    }
    Ok(())
}
