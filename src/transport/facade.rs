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

//! The public transport facade (C8): [`Transport`] spawns and owns the
//! single operations-executor task, and exposes `send`/`message_id`/
//! `cancel_transmission`/`cancel_connection`/`close_all` as async calls
//! over its command channel — the same shape `networking::p2p::P2pService`
//! uses to hide its swarm event loop behind a handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, trace, warn};

use crate::codec::{self, Message, Token};

use super::clock::{Clock, SystemClock};
use super::command::Command;
use super::delegate::{Delegate, TransportError};
use super::endpoint::Endpoint;
use super::keepalive::{self, KeepaliveAction};
use super::registry::{ConnectionState, PeerConnection, PendingSend};
use super::router::{self, DelegateEntry, TransactionId};
use super::socket::{DefaultSocketFactory, Socket, SocketFactory};
use crate::monitoring::metrics::Metrics;

const COMMAND_CHANNEL_CAPACITY: usize = 256;
const SETUP_TIMEOUT: Duration = Duration::from_secs(2);
const RECV_BUFFER_SIZE: usize = 2048;

/// A handle to the running transport. Cloning shares the same executor
/// task and command channel; dropping the last clone aborts the executor.
#[derive(Clone)]
pub struct Transport {
    tx: mpsc::Sender<Command>,
    _executor: Arc<ExecutorGuard>,
}

/// Aborts the operations-executor task when the last [`Transport`] clone
/// referencing it is dropped. A bare `JoinHandle` would just detach the
/// task instead, leaking it for the process lifetime.
struct ExecutorGuard(tokio::task::JoinHandle<()>);

impl Drop for ExecutorGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Transport {
    /// Starts the operations executor with the default UDP socket
    /// factory and the real wall clock.
    pub fn new() -> Self {
        Self::with_collaborators(Arc::new(DefaultSocketFactory::udp()), Arc::new(SystemClock))
    }

    /// Starts the operations executor against caller-supplied socket
    /// factory and clock, the seam tests use to run the state machine
    /// without real sockets or real time. Registers its own [`Metrics`]
    /// against a fresh registry; use [`Transport::with_metrics`] to share
    /// one process-wide registry across multiple transports.
    pub fn with_collaborators(socket_factory: Arc<dyn SocketFactory>, clock: Arc<dyn Clock>) -> Self {
        let metrics = Arc::new(Metrics::new().expect("metric names are fixed and never collide"));
        Self::with_metrics(socket_factory, clock, metrics)
    }

    /// Starts the operations executor against caller-supplied collaborators
    /// and a caller-owned [`Metrics`] instance.
    pub fn with_metrics(socket_factory: Arc<dyn SocketFactory>, clock: Arc<dyn Clock>, metrics: Arc<Metrics>) -> Self {
        Self::build(socket_factory, clock, metrics, SETUP_TIMEOUT, keepalive::DEFAULT_PERIOD)
    }

    /// Starts the operations executor from a [`crate::config::TransportConfig`]:
    /// resolves its security mode into a [`SocketFactory`] and carries its
    /// setup-timeout/keepalive-period into the executor.
    pub fn with_config(config: &crate::config::TransportConfig) -> Result<Self, crate::config::ConfigError> {
        let params = config.network_parameters()?;
        let socket_factory: Arc<dyn SocketFactory> = Arc::new(DefaultSocketFactory::new(params));
        let metrics = Arc::new(Metrics::new().expect("metric names are fixed and never collide"));
        Ok(Self::build(
            socket_factory,
            Arc::new(SystemClock),
            metrics,
            config.setup_timeout(),
            config.keepalive_period(),
        ))
    }

    fn build(
        socket_factory: Arc<dyn SocketFactory>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        setup_timeout: Duration,
        keepalive_period: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let executor = Executor {
            connections: HashMap::new(),
            delegates: HashMap::new(),
            socket_factory,
            clock,
            tx: tx.clone(),
            setup_timeout,
            keepalive_period,
            metrics,
        };
        let handle = tokio::spawn(executor.run(rx));
        Self {
            tx,
            _executor: Arc::new(ExecutorGuard(handle)),
        }
    }

    /// Sends `message` to `endpoint`. If `delegate` is present, it is
    /// registered against `message`'s token and receives the eventual
    /// reply — every notification, if `message` carries a fresh Observe
    /// option, otherwise just the first one.
    pub async fn send(
        &self,
        message: Message,
        endpoint: Endpoint,
        delegate: Option<Arc<dyn Delegate>>,
    ) -> Result<(), TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Send { message, endpoint, delegate, reply })
            .await
            .map_err(|_| TransportError::Setup("transport executor is not running".into()))?;
        rx.await
            .map_err(|_| TransportError::Setup("transport executor dropped the reply".into()))?
    }

    /// Issues the next message id for `endpoint`, creating its
    /// connection record if this is the first call.
    pub async fn next_message_id(&self, endpoint: Endpoint) -> u16 {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::NextMessageId { endpoint, reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Drops one `(token, endpoint)` delegate registration.
    pub async fn cancel_transmission(&self, endpoint: Endpoint, token: Token) {
        let _ = self.tx.send(Command::CancelTransmission { endpoint, token }).await;
    }

    /// Tears down `endpoint`'s connection and all of its delegates.
    pub async fn cancel_connection(&self, endpoint: Endpoint) {
        let _ = self.tx.send(Command::CancelConnection { endpoint }).await;
    }

    /// Tears down every connection.
    pub async fn close_all(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::CloseAll { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns every mutable map; runs as the single task processing `Command`s.
struct Executor {
    connections: HashMap<Endpoint, PeerConnection>,
    delegates: HashMap<TransactionId, DelegateEntry>,
    socket_factory: Arc<dyn SocketFactory>,
    clock: Arc<dyn Clock>,
    tx: mpsc::Sender<Command>,
    setup_timeout: Duration,
    keepalive_period: Duration,
    metrics: Arc<Metrics>,
}

impl Executor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
            self.metrics.active_connections.set(self.connections.len() as i64);
            self.metrics.active_delegates.set(self.delegates.len() as i64);
        }
        trace!("transport operations executor stopped: command channel closed");
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Send { message, endpoint, delegate, reply } => {
                self.handle_send(message, endpoint, delegate, reply);
            }
            Command::NextMessageId { endpoint, reply } => {
                let now = self.clock.now();
                let conn = self.connections.entry(endpoint).or_insert_with(|| PeerConnection::new(now));
                let _ = reply.send(conn.next_message_id());
            }
            Command::CancelTransmission { endpoint, token } => {
                self.delegates.remove(&(token, endpoint));
            }
            Command::CancelConnection { endpoint } => {
                info!(%endpoint, "cancelling connection");
                router::evict_peer(&endpoint, ConnectionState::Cancelled, &mut self.connections, &mut self.delegates);
            }
            Command::CloseAll { reply } => {
                info!(count = self.connections.len(), "closing all connections");
                self.connections.clear();
                self.delegates.clear();
                let _ = reply.send(());
            }
            Command::Inbound { endpoint, bytes } => self.handle_inbound(endpoint, bytes),
            Command::SocketReady { endpoint, socket } => self.handle_socket_ready(endpoint, socket),
            Command::SocketFailed { endpoint, error } => self.handle_socket_failed(endpoint, error),
            Command::SocketIoFailed { endpoint, error } => self.handle_socket_io_failed(endpoint, error),
            Command::SetupTimeout { endpoint } => self.handle_setup_timeout(endpoint),
            Command::KeepaliveTick { endpoint } => self.handle_keepalive_tick(endpoint),
        }
    }

    fn handle_send(
        &mut self,
        message: Message,
        endpoint: Endpoint,
        delegate: Option<Arc<dyn Delegate>>,
        reply: oneshot::Sender<Result<(), TransportError>>,
    ) {
        let bytes = match codec::encode(&message) {
            Ok(b) => b,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        if let Some(delegate) = delegate {
            let is_observation = message.is_observation();
            self.delegates.insert(
                (message.token, endpoint.clone()),
                DelegateEntry { delegate, is_observation },
            );
        }

        let now = self.clock.now();
        let is_fresh = !self.connections.contains_key(&endpoint)
            || self.connections.get(&endpoint).map(|c| c.state.is_terminal()).unwrap_or(false);
        if is_fresh {
            self.connections.insert(endpoint.clone(), PeerConnection::new(now));
        }
        let conn = self.connections.get_mut(&endpoint).expect("just inserted or already present");

        match conn.state {
            ConnectionState::Ready => {
                let socket = conn.socket.clone().expect("Ready implies a socket");
                dispatch_send(socket, bytes, reply, self.metrics.clone());
            }
            ConnectionState::Setup | ConnectionState::Preparing | ConnectionState::Waiting => {
                let (io_reply, io_rx) = oneshot::channel();
                conn.pending_sends.push(PendingSend { bytes, reply: io_reply });
                tokio::spawn(async move {
                    let _ = reply.send(match io_rx.await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(TransportError::Send(e.to_string())),
                        Err(_) => Err(TransportError::Setup("connection torn down before send".into())),
                    });
                });
                if conn.state == ConnectionState::Setup {
                    self.begin_setup(endpoint);
                }
            }
            ConnectionState::Cancelled | ConnectionState::Failed => {
                unreachable!("fresh connections are never inserted in a terminal state")
            }
        }
    }

    fn begin_setup(&mut self, endpoint: Endpoint) {
        let conn = self.connections.get_mut(&endpoint).expect("connection just ensured");
        conn.state = ConnectionState::Preparing;

        let factory = self.socket_factory.clone();
        let tx = self.tx.clone();
        let connect_endpoint = endpoint.clone();
        tokio::spawn(async move {
            match factory.connect(connect_endpoint.clone()).await {
                Ok(socket) => {
                    let _ = tx
                        .send(Command::SocketReady { endpoint: connect_endpoint, socket: Arc::new(socket) })
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(Command::SocketFailed { endpoint: connect_endpoint, error: e.to_string() })
                        .await;
                }
            }
        });

        let clock = self.clock.clone();
        let timeout_tx = self.tx.clone();
        let timeout_endpoint = endpoint.clone();
        let timeout = self.setup_timeout;
        conn.setup_timer_task = Some(tokio::spawn(async move {
            clock.sleep(timeout).await;
            let _ = timeout_tx.send(Command::SetupTimeout { endpoint: timeout_endpoint }).await;
        }));
    }

    fn handle_socket_ready(&mut self, endpoint: Endpoint, socket: Arc<Socket>) {
        let Some(conn) = self.connections.get_mut(&endpoint) else { return };
        if conn.state != ConnectionState::Preparing {
            return;
        }
        if let Some(h) = conn.setup_timer_task.take() {
            h.abort();
        }
        conn.socket = Some(socket.clone());
        conn.state = ConnectionState::Ready;
        conn.last_received = self.clock.now();
        info!(%endpoint, "connection ready");

        for pending in conn.pending_sends.drain(..) {
            dispatch_send_io(socket.clone(), pending.bytes, pending.reply, self.metrics.clone());
        }

        conn.receive_task = Some(spawn_receive_loop(endpoint.clone(), socket, self.tx.clone(), self.metrics.clone()));
        conn.keepalive_task = Some(keepalive::spawn_tick_after(
            endpoint,
            self.clock.clone(),
            self.keepalive_period,
            self.tx.clone(),
        ));
    }

    fn handle_socket_failed(&mut self, endpoint: Endpoint, error: String) {
        warn!(%endpoint, %error, "socket setup failed");
        self.fail_connection(endpoint, TransportError::Setup(error));
    }

    fn handle_socket_io_failed(&mut self, endpoint: Endpoint, error: String) {
        warn!(%endpoint, %error, "socket read failed after connection was ready");
        self.fail_connection(endpoint, TransportError::SocketIo(error));
    }

    fn handle_setup_timeout(&mut self, endpoint: Endpoint) {
        if matches!(self.connections.get(&endpoint).map(|c| c.state), Some(ConnectionState::Preparing)) {
            warn!(%endpoint, "connection setup timed out");
            self.fail_connection(endpoint, TransportError::Setup("setup timed out".into()));
        }
    }

    fn fail_connection(&mut self, endpoint: Endpoint, error: TransportError) {
        self.notify_all(&endpoint, error);
        router::evict_peer(&endpoint, ConnectionState::Failed, &mut self.connections, &mut self.delegates);
    }

    fn handle_keepalive_tick(&mut self, endpoint: Endpoint) {
        let Some((state, last_received, socket)) = self
            .connections
            .get(&endpoint)
            .map(|c| (c.state, c.last_received, c.socket.clone()))
        else {
            return;
        };
        if state != ConnectionState::Ready {
            return;
        }
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(last_received);
        let action = keepalive::evaluate(last_received, now, self.keepalive_period);

        match action {
            KeepaliveAction::Healthy => {}
            KeepaliveAction::SendProbe => {
                trace!(%endpoint, "sending keepalive ping");
                self.metrics.keepalive_probes_sent_total.inc();
                if let Some(socket) = socket {
                    let mid = self.connections.get_mut(&endpoint).unwrap().next_message_id();
                    let ping = Message::ping(mid);
                    if let Ok(bytes) = codec::encode(&ping) {
                        let metrics = self.metrics.clone();
                        tokio::spawn(async move {
                            if socket.send(&bytes).await.is_ok() {
                                metrics.datagrams_sent_total.inc();
                            }
                        });
                    }
                }
            }
            KeepaliveAction::Dead => {
                warn!(%endpoint, "peer declared dead after keepalive silence");
                self.metrics.keepalive_timeouts_total.inc();
                self.fail_connection(endpoint.clone(), TransportError::PingTimeout);
                return;
            }
        }

        let delay = keepalive::next_delay(action, self.keepalive_period, elapsed);
        if let Some(conn) = self.connections.get_mut(&endpoint) {
            conn.keepalive_task = Some(keepalive::spawn_tick_after(
                endpoint,
                self.clock.clone(),
                delay,
                self.tx.clone(),
            ));
        }
    }

    fn handle_inbound(&mut self, endpoint: Endpoint, bytes: Vec<u8>) {
        let now = self.clock.now();
        let Some(outcome) =
            router::route_inbound(&bytes, &endpoint, &mut self.connections, &mut self.delegates, now)
        else {
            self.metrics.decode_errors_total.inc();
            return;
        };

        if let Some(reply_msg) = outcome.outbound {
            match reply_msg.mtype {
                crate::codec::Type::Acknowledgement => self.metrics.auto_acks_sent_total.inc(),
                crate::codec::Type::Reset => self.metrics.auto_resets_sent_total.inc(),
                _ => {}
            }
            if let Some(socket) = self.connections.get(&endpoint).and_then(|c| c.socket.clone()) {
                if let Ok(reply_bytes) = codec::encode(&reply_msg) {
                    let metrics = self.metrics.clone();
                    tokio::spawn(async move {
                        if socket.send(&reply_bytes).await.is_ok() {
                            metrics.datagrams_sent_total.inc();
                        }
                    });
                }
            }
        }

        if let Some(delegate) = outcome.deliver {
            delegate.did_receive_data(&bytes, &endpoint);
        }
    }

    fn notify_all(&self, endpoint: &Endpoint, error: TransportError) {
        for (_, entry) in self.delegates.iter().filter(|((_, ep), _)| ep == endpoint) {
            entry.delegate.did_fail(error.clone());
        }
    }
}

fn dispatch_send(
    socket: Arc<Socket>,
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<(), TransportError>>,
    metrics: Arc<Metrics>,
) {
    tokio::spawn(async move {
        let result = socket.send(&bytes).await.map_err(|e| TransportError::Send(e.to_string()));
        if result.is_ok() {
            metrics.datagrams_sent_total.inc();
        }
        let _ = reply.send(result);
    });
}

fn dispatch_send_io(
    socket: Arc<Socket>,
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<(), std::io::Error>>,
    metrics: Arc<Metrics>,
) {
    tokio::spawn(async move {
        let result = socket.send(&bytes).await;
        if result.is_ok() {
            metrics.datagrams_sent_total.inc();
        }
        let _ = reply.send(result);
    });
}

fn spawn_receive_loop(
    endpoint: Endpoint,
    socket: Arc<Socket>,
    tx: mpsc::Sender<Command>,
    metrics: Arc<Metrics>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            match socket.recv(&mut buf).await {
                Ok(n) => {
                    metrics.datagrams_received_total.inc();
                    let bytes = buf[..n].to_vec();
                    if tx.send(Command::Inbound { endpoint: endpoint.clone(), bytes }).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!(%endpoint, error = %e, "socket read failed");
                    let _ = tx
                        .send(Command::SocketIoFailed { endpoint: endpoint.clone(), error: e.to_string() })
                        .await;
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Code, Type};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::net::UdpSocket as TokioUdpSocket;

    struct CountingDelegate {
        received: AtomicUsize,
        failures: Mutex<Vec<TransportError>>,
    }

    impl CountingDelegate {
        fn new() -> Arc<Self> {
            Arc::new(Self { received: AtomicUsize::new(0), failures: Mutex::new(Vec::new()) })
        }
    }

    impl Delegate for CountingDelegate {
        fn did_receive_data(&self, _raw_bytes: &[u8], _endpoint: &Endpoint) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
        fn did_fail(&self, error: TransportError) {
            self.failures.lock().unwrap().push(error);
        }
    }

    #[tokio::test]
    async fn send_over_real_udp_reaches_an_echo_peer() {
        let echo = TokioUdpSocket::bind("127.0.0.1:0").await.unwrap();
        let echo_port = echo.local_addr().unwrap().port();
        let echo_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (n, from) = echo.recv_from(&mut buf).await.unwrap();
            echo.send_to(&buf[..n], from).await.unwrap();
        });

        let transport = Transport::new();
        let endpoint = Endpoint::udp("127.0.0.1", echo_port);
        let delegate = CountingDelegate::new();
        let message = Message::new(Type::NonConfirmable, Code::GET, 1, Token(0));

        transport.send(message, endpoint, Some(delegate.clone())).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while delegate.received.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("echo reply was never delivered");

        echo_task.await.unwrap();
    }

    #[tokio::test]
    async fn message_ids_for_the_same_endpoint_are_sequenced() {
        let transport = Transport::new();
        let endpoint = Endpoint::udp("127.0.0.1", 9); // discard port, never actually connects
        let first = transport.next_message_id(endpoint.clone()).await;
        let second = transport.next_message_id(endpoint).await;
        let expected_second = if first == 0xFFFF { 1 } else { first + 1 };
        assert_eq!(second, expected_second);
    }
}
