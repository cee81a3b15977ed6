//! Client - owns the connection and the event bus.
//!
//! This module provides [`Client`], the object applications hold while a
//! device connects, pairs, and logs in.
//!
//! # Architecture
//!
//! Client uses a pure state machine (from link-core) for connection logic
//! and interprets the actions to perform actual I/O via the Transport trait
//! and to dispatch events on its [`EventBus`].
//!
//! ```text
//! Transport → Client → EventBus → handlers (e.g. the pairing stream)
//!               ↓
//!          link-core (pure state machine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use link_client::{Client, ClientConfig, MemoryStore, MockTransport};
//!
//! let client = Client::new(
//!     ClientConfig::new("pair.example.net"),
//!     MockTransport::new(),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! client.connect().await?;
//! tokio::spawn({
//!     let client = client.clone();
//!     async move { client.run().await }
//! });
//! ```

use link_core::{Action, ConnectionState, Event};
use link_types::{ClientEvent, ServerFrame};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::bus::{EventBus, HandlerId};
use crate::store::DeviceStore;
use crate::transport::{Transport, TransportError};

/// Default number of pairing codes a pairing stream buffers for a slow reader.
pub const DEFAULT_QR_BUFFER: usize = 7;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// `connect()` was called while a connection is open or opening.
    #[error("already connected")]
    AlreadyConnected,
}

/// Configuration for Client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the pairing server.
    pub server_address: String,
    /// Pairing codes a pairing stream can hold before the reader must catch up.
    pub qr_buffer: usize,
}

impl ClientConfig {
    /// Create a configuration for the given server.
    pub fn new(server_address: &str) -> Self {
        Self {
            server_address: server_address.to_string(),
            qr_buffer: DEFAULT_QR_BUFFER,
        }
    }

    /// Set how many pairing codes a pairing stream buffers.
    pub fn with_qr_buffer(mut self, qr_buffer: usize) -> Self {
        self.qr_buffer = qr_buffer;
        self
    }
}

pub(crate) struct ClientInner<T: Transport> {
    pub(crate) config: ClientConfig,
    pub(crate) transport: T,
    pub(crate) store: Arc<dyn DeviceStore>,
    pub(crate) bus: EventBus,
    state: Mutex<ConnectionState>,
}

/// The pairlink client.
///
/// Cloning is cheap; clones share the connection, store and event bus.
pub struct Client<T: Transport> {
    pub(crate) inner: Arc<ClientInner<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Create a new Client.
    pub fn new(config: ClientConfig, transport: T, store: Arc<dyn DeviceStore>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                store,
                bus: EventBus::new(),
                state: Mutex::new(ConnectionState::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ClientInner<T>> {
        Arc::downgrade(&self.inner)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The device store.
    pub fn store(&self) -> &Arc<dyn DeviceStore> {
        &self.inner.store
    }

    /// Connect to the server.
    ///
    /// Frames are not read here; drive them with [`run`](Self::run) or
    /// [`handle_frame`](Self::handle_frame).
    pub async fn connect(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.state.lock().await;
            if *state != ConnectionState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            let (new_state, _actions) = state.clone().on_event(Event::ConnectRequested);
            *state = new_state;
        }

        let address = &self.inner.config.server_address;
        tracing::info!("Connecting to {}", address);

        if let Err(e) = self.inner.transport.connect(address).await {
            tracing::warn!("Connection to {} failed: {}", address, e);
            self.transition(Event::ConnectFailed {
                error: e.to_string(),
            })
            .await?;
            return Err(ClientError::ConnectionFailed(e.to_string()));
        }

        self.transition(Event::ConnectSucceeded).await
    }

    /// Check if a connection is open.
    pub async fn is_connected(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.is_connected()
    }

    /// Check if logged in with a device identity.
    pub async fn is_logged_in(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.is_logged_in()
    }

    /// Disconnect from the server.
    ///
    /// A requested disconnect does not dispatch [`ClientEvent::Disconnected`].
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        tracing::info!("Disconnecting");
        self.transition(Event::DisconnectRequested).await
    }

    /// Feed one server frame into the connection state machine.
    pub async fn handle_frame(&self, frame: ServerFrame) -> Result<(), ClientError> {
        let event = match frame {
            ServerFrame::PairDevice {
                codes,
                code_timeout,
            } => Event::PairingCodesReceived {
                codes,
                timeout: code_timeout,
            },
            ServerFrame::PairSuccess {
                device_id,
                platform,
            } => {
                tracing::info!("Paired as {:?} with a {} phone", device_id, platform);
                Event::PairingCompleted {
                    device_id,
                    platform,
                }
            }
            ServerFrame::LoginSuccess => Event::LoginSucceeded,
            ServerFrame::LoginFailure { reason } => Event::LoginFailed { reason },
            ServerFrame::LoggedOut { reason } => Event::LoggedOut { reason },
        };
        self.transition(event).await
    }

    /// Read frames from the transport until it closes.
    ///
    /// A receive timeout is reported as [`ClientEvent::KeepAliveTimeout`] and
    /// reading continues.
    ///
    /// A transport that closes on its own is reported as
    /// [`ClientEvent::Disconnected`]; one closed by [`disconnect`](Self::disconnect)
    /// is not.
    pub async fn run(&self) -> Result<(), ClientError> {
        loop {
            match self.inner.transport.recv().await {
                Ok(frame) => self.handle_frame(frame).await?,
                Err(TransportError::Timeout) => {
                    tracing::warn!("No frame within the keep-alive window");
                    self.transition(Event::KeepAliveMissed).await?;
                }
                Err(e) => {
                    tracing::debug!("Transport stopped delivering frames: {}", e);
                    return self
                        .transition(Event::ConnectionLost {
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    /// Register an event handler.
    pub fn add_event_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.inner.bus.add_handler(handler)
    }

    /// Remove an event handler. Returns false if it was not registered.
    pub fn remove_event_handler(&self, id: HandlerId) -> bool {
        self.inner.bus.remove_handler(id)
    }

    /// Number of registered event handlers.
    pub fn event_handler_count(&self) -> usize {
        self.inner.bus.handler_count()
    }

    /// Dispatch an event to every registered handler.
    pub fn dispatch_event(&self, event: &ClientEvent) {
        self.inner.bus.dispatch(event);
    }

    async fn transition(&self, event: Event) -> Result<(), ClientError> {
        let actions = {
            let mut state = self.inner.state.lock().await;
            let (new_state, actions) = state.clone().on_event(event);
            *state = new_state;
            actions
        };
        self.execute(actions).await
    }

    async fn execute(&self, actions: Vec<Action>) -> Result<(), ClientError> {
        for action in actions {
            match action {
                Action::CloseTransport => self.inner.transport.close().await?,
                Action::StoreIdentity(id) => self.inner.store.set_device_id(Some(id)),
                Action::ClearIdentity => self.inner.store.set_device_id(None),
                Action::EmitEvent(event) => self.inner.bus.dispatch(&event),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::MockTransport;
    use link_types::DeviceId;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn test_client(store: MemoryStore) -> (Client<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let client = Client::new(
            ClientConfig::new("test-server"),
            transport.clone(),
            Arc::new(store),
        );
        (client, transport)
    }

    fn record_events(client: &Client<MockTransport>) -> Arc<StdMutex<Vec<ClientEvent>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));
        seen
    }

    // ===========================================
    // Configuration Tests
    // ===========================================

    #[test]
    fn config_defaults_qr_buffer() {
        let config = ClientConfig::new("server");
        assert_eq!(config.server_address, "server");
        assert_eq!(config.qr_buffer, DEFAULT_QR_BUFFER);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ClientConfig::new("server").with_qr_buffer(3);
        assert_eq!(config.qr_buffer, 3);
    }

    // ===========================================
    // Connection Tests
    // ===========================================

    #[tokio::test]
    async fn client_connects_via_transport() {
        let (client, transport) = test_client(MemoryStore::new());

        assert!(!client.is_connected().await);
        client.connect().await.unwrap();

        assert!(client.is_connected().await);
        assert!(!client.is_logged_in().await);
        assert_eq!(transport.connected_address(), Some("test-server".to_string()));
    }

    #[tokio::test]
    async fn connect_twice_is_rejected() {
        let (client, transport) = test_client(MemoryStore::new());
        client.connect().await.unwrap();

        let result = client.connect().await;
        assert!(matches!(result, Err(ClientError::AlreadyConnected)));
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn connect_failure_returns_error_and_emits_event() {
        let (client, transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        transport.fail_next_connect("network unreachable");

        let result = client.connect().await;

        assert!(matches!(result, Err(ClientError::ConnectionFailed(_))));
        assert!(!client.is_connected().await);
        assert!(matches!(
            events.lock().unwrap().as_slice(),
            [ClientEvent::ConnectFailure { .. }]
        ));
    }

    #[tokio::test]
    async fn client_disconnects_without_event() {
        let (client, transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        client.connect().await.unwrap();

        client.disconnect().await.unwrap();

        assert!(!client.is_connected().await);
        assert!(!transport.is_connected());
        assert!(events.lock().unwrap().is_empty());
    }

    // ===========================================
    // Frame Handling Tests
    // ===========================================

    #[tokio::test]
    async fn pair_device_frame_dispatches_qr_event() {
        let (client, _transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        client.connect().await.unwrap();

        client
            .handle_frame(ServerFrame::PairDevice {
                codes: vec!["1@ABC".into()],
                code_timeout: Duration::from_secs(20),
            })
            .await
            .unwrap();

        match events.lock().unwrap().as_slice() {
            [ClientEvent::Qr(qr)] => assert_eq!(qr.codes, vec!["1@ABC"]),
            other => panic!("Expected Qr event, got {:?}", other),
        };
    }

    #[tokio::test]
    async fn pair_success_frame_stores_identity() {
        let store = Arc::new(MemoryStore::new());
        let transport = MockTransport::new();
        let client = Client::new(
            ClientConfig::new("test-server"),
            transport.clone(),
            store.clone(),
        );
        let events = record_events(&client);
        client.connect().await.unwrap();

        let device_id = DeviceId::random();
        client
            .handle_frame(ServerFrame::PairDevice {
                codes: vec!["1@ABC".into()],
                code_timeout: Duration::from_secs(20),
            })
            .await
            .unwrap();
        client
            .handle_frame(ServerFrame::PairSuccess {
                device_id,
                platform: "android".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.device_id(), Some(device_id));
        assert!(client.is_logged_in().await);
        assert!(matches!(
            events.lock().unwrap().last(),
            Some(ClientEvent::PairSuccess(success)) if success.device_id == device_id
        ));
    }

    #[tokio::test]
    async fn login_with_existing_identity_emits_connected() {
        let (client, _transport) = test_client(MemoryStore::with_device_id(DeviceId::random()));
        let events = record_events(&client);
        client.connect().await.unwrap();

        client.handle_frame(ServerFrame::LoginSuccess).await.unwrap();

        assert!(client.is_logged_in().await);
        assert_eq!(*events.lock().unwrap(), vec![ClientEvent::Connected]);
    }

    #[tokio::test]
    async fn logged_out_frame_clears_identity() {
        let store = Arc::new(MemoryStore::with_device_id(DeviceId::random()));
        let transport = MockTransport::new();
        let client = Client::new(ClientConfig::new("s"), transport.clone(), store.clone());
        client.connect().await.unwrap();
        client.handle_frame(ServerFrame::LoginSuccess).await.unwrap();

        client
            .handle_frame(ServerFrame::LoggedOut {
                reason: "removed from phone".into(),
            })
            .await
            .unwrap();

        assert!(!store.has_identity());
        assert!(!transport.is_connected());
    }

    // ===========================================
    // Run Loop Tests
    // ===========================================

    #[tokio::test]
    async fn run_reports_remote_close_as_disconnected() {
        let (client, transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        client.connect().await.unwrap();
        transport.queue_frame(ServerFrame::PairDevice {
            codes: vec!["1@ABC".into()],
            code_timeout: Duration::from_secs(20),
        });

        let pump = tokio::spawn({
            let client = client.clone();
            async move { client.run().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.close().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("run should return once the transport closes")
            .unwrap()
            .unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(ClientEvent::Qr(_))));
        assert_eq!(events.last(), Some(&ClientEvent::Disconnected));
    }

    #[tokio::test]
    async fn run_after_requested_disconnect_is_silent() {
        let (client, _transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        client.connect().await.unwrap();

        let pump = tokio::spawn({
            let client = client.clone();
            async move { client.run().await }
        });

        client.disconnect().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("run should return after disconnect")
            .unwrap()
            .unwrap();

        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn receive_timeout_reports_keep_alive_and_keeps_reading() {
        let (client, transport) = test_client(MemoryStore::new());
        let events = record_events(&client);
        client.connect().await.unwrap();
        transport.time_out_next_recv();
        transport.queue_frame(ServerFrame::PairDevice {
            codes: vec!["1@ABC".into()],
            code_timeout: Duration::from_secs(20),
        });

        let pump = tokio::spawn({
            let client = client.clone();
            async move { client.run().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.is_connected().await);
        transport.close().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("run should return once the transport closes")
            .unwrap()
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], ClientEvent::KeepAliveTimeout);
        assert!(matches!(events[1], ClientEvent::Qr(_)));
        assert_eq!(events.last(), Some(&ClientEvent::Disconnected));
    }

    #[tokio::test]
    async fn handlers_can_be_removed() {
        let (client, _transport) = test_client(MemoryStore::new());
        let id = client.add_event_handler(|_| {});
        assert_eq!(client.event_handler_count(), 1);

        assert!(client.remove_event_handler(id));
        assert_eq!(client.event_handler_count(), 0);
    }
}
