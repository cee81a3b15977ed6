//! Connection state machine for pairlink.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! connection lifecycle. The state machine takes events as input and produces
//! a new state plus a list of actions to execute.
//!
//! The actual I/O (closing the transport, dispatching events, writing the
//! device store) is performed by link-client, not by this module.

use link_types::{ClientEvent, DeviceId, PairSuccess, QrEvent};
use std::time::Duration;

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open.
    Disconnected,
    /// Transport connection attempt in progress.
    Connecting,
    /// Socket open, waiting for the server's first frame.
    Handshaking,
    /// Socket open, showing pairing codes until a phone scans one.
    Pairing,
    /// Logged in with a device identity.
    Connected,
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (link-client)
    /// is responsible for executing the returned actions in order.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested) => (Self::Connecting, vec![]),

            // From Connecting
            (Self::Connecting, Event::ConnectSucceeded) => (Self::Handshaking, vec![]),
            (Self::Connecting, Event::ConnectFailed { error }) => (
                Self::Disconnected,
                vec![Action::EmitEvent(ClientEvent::ConnectFailure { reason: error })],
            ),

            // Pairing codes may arrive first, or refresh an earlier batch
            (Self::Handshaking | Self::Pairing, Event::PairingCodesReceived { codes, timeout }) => (
                Self::Pairing,
                vec![Action::EmitEvent(ClientEvent::Qr(QrEvent { codes, timeout }))],
            ),
            (
                Self::Pairing,
                Event::PairingCompleted {
                    device_id,
                    platform,
                },
            ) => (
                Self::Connected,
                vec![
                    Action::StoreIdentity(device_id),
                    Action::EmitEvent(ClientEvent::PairSuccess(PairSuccess {
                        device_id,
                        platform,
                    })),
                ],
            ),

            // Login with an existing identity
            (Self::Handshaking, Event::LoginSucceeded) => (
                Self::Connected,
                vec![Action::EmitEvent(ClientEvent::Connected)],
            ),
            (Self::Handshaking, Event::LoginFailed { reason }) => (
                Self::Disconnected,
                vec![
                    Action::CloseTransport,
                    Action::EmitEvent(ClientEvent::ConnectFailure { reason }),
                ],
            ),
            (Self::Connected, Event::LoggedOut { reason }) => (
                Self::Disconnected,
                vec![
                    Action::ClearIdentity,
                    Action::CloseTransport,
                    Action::EmitEvent(ClientEvent::LoggedOut { reason }),
                ],
            ),

            // Socket-level endings
            (
                Self::Handshaking | Self::Pairing | Self::Connected,
                Event::ConnectionLost { .. },
            ) => (
                Self::Disconnected,
                vec![Action::EmitEvent(ClientEvent::Disconnected)],
            ),
            (
                Self::Connecting | Self::Handshaking | Self::Pairing | Self::Connected,
                Event::DisconnectRequested,
            ) => (Self::Disconnected, vec![Action::CloseTransport]),
            (
                state @ (Self::Handshaking | Self::Pairing | Self::Connected),
                Event::KeepAliveMissed,
            ) => (state, vec![Action::EmitEvent(ClientEvent::KeepAliveTimeout)]),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if a socket is currently open.
    ///
    /// True while handshaking and pairing as well, not only once logged in.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Handshaking | Self::Pairing | Self::Connected)
    }

    /// Check if currently logged in with a device identity.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User requested connection.
    ConnectRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Server sent a batch of pairing codes.
    PairingCodesReceived {
        /// Codes in display order.
        codes: Vec<String>,
        /// How long each code stays valid.
        timeout: Duration,
    },
    /// A phone scanned one of the codes.
    PairingCompleted {
        /// The identity assigned to this device.
        device_id: DeviceId,
        /// Platform of the phone that scanned the code.
        platform: String,
    },
    /// Server accepted the stored identity.
    LoginSucceeded,
    /// Server refused the stored identity.
    LoginFailed {
        /// Reason given by the server.
        reason: String,
    },
    /// Server revoked the stored identity.
    LoggedOut {
        /// Reason given by the server.
        reason: String,
    },
    /// Transport closed underneath us.
    ConnectionLost {
        /// Reason for disconnection.
        reason: String,
    },
    /// User requested disconnect.
    DisconnectRequested,
    /// The server went quiet for longer than the keep-alive window.
    KeepAliveMissed,
}

/// Actions to be executed by link-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Close the transport.
    CloseTransport,
    /// Save the identity in the device store.
    StoreIdentity(DeviceId),
    /// Remove the identity from the device store.
    ClearIdentity,
    /// Dispatch an event on the client's event bus.
    EmitEvent(ClientEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes_event() -> Event {
        Event::PairingCodesReceived {
            codes: vec!["1@ABC".into(), "2@DEF".into()],
            timeout: Duration::from_secs(20),
        }
    }

    #[test]
    fn starts_disconnected() {
        let state = ConnectionState::new();
        assert!(matches!(state, ConnectionState::Disconnected));
        assert!(!state.is_connected());
    }

    #[test]
    fn connect_flow_reaches_handshaking() {
        let (state, actions) = ConnectionState::Disconnected.on_event(Event::ConnectRequested);
        assert_eq!(state, ConnectionState::Connecting);
        assert!(actions.is_empty());
        assert!(!state.is_connected());

        let (state, actions) = state.on_event(Event::ConnectSucceeded);
        assert_eq!(state, ConnectionState::Handshaking);
        assert!(actions.is_empty());
        assert!(state.is_connected());
    }

    #[test]
    fn connect_failure_emits_connect_failure() {
        let (state, actions) = ConnectionState::Connecting.on_event(Event::ConnectFailed {
            error: "network unreachable".into(),
        });

        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(
            actions,
            vec![Action::EmitEvent(ClientEvent::ConnectFailure {
                reason: "network unreachable".into()
            })]
        );
    }

    #[test]
    fn pairing_codes_emit_qr_event() {
        let (state, actions) = ConnectionState::Handshaking.on_event(codes_event());

        assert_eq!(state, ConnectionState::Pairing);
        match &actions[..] {
            [Action::EmitEvent(ClientEvent::Qr(qr))] => {
                assert_eq!(qr.codes, vec!["1@ABC", "2@DEF"]);
                assert_eq!(qr.timeout, Duration::from_secs(20));
            }
            other => panic!("Expected single Qr emission, got {:?}", other),
        }
    }

    #[test]
    fn pairing_codes_can_refresh_while_pairing() {
        let (state, actions) = ConnectionState::Pairing.on_event(codes_event());
        assert_eq!(state, ConnectionState::Pairing);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn pairing_codes_ignored_once_logged_in() {
        let (state, actions) = ConnectionState::Connected.on_event(codes_event());
        assert_eq!(state, ConnectionState::Connected);
        assert!(actions.is_empty());
    }

    #[test]
    fn pairing_completed_stores_identity_before_emitting() {
        let device_id = DeviceId::random();
        let (state, actions) = ConnectionState::Pairing.on_event(Event::PairingCompleted {
            device_id,
            platform: "android".into(),
        });

        assert_eq!(state, ConnectionState::Connected);
        assert!(state.is_logged_in());
        assert_eq!(
            actions,
            vec![
                Action::StoreIdentity(device_id),
                Action::EmitEvent(ClientEvent::PairSuccess(PairSuccess {
                    device_id,
                    platform: "android".into(),
                })),
            ]
        );
    }

    #[test]
    fn login_success_emits_connected() {
        let (state, actions) = ConnectionState::Handshaking.on_event(Event::LoginSucceeded);
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(actions, vec![Action::EmitEvent(ClientEvent::Connected)]);
    }

    #[test]
    fn login_failure_closes_and_emits_connect_failure() {
        let (state, actions) = ConnectionState::Handshaking.on_event(Event::LoginFailed {
            reason: "401".into(),
        });
        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(actions[0], Action::CloseTransport);
        assert!(matches!(
            &actions[1],
            Action::EmitEvent(ClientEvent::ConnectFailure { reason }) if reason == "401"
        ));
    }

    #[test]
    fn logged_out_clears_identity() {
        let (state, actions) = ConnectionState::Connected.on_event(Event::LoggedOut {
            reason: "device removed".into(),
        });
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.contains(&Action::ClearIdentity));
        assert!(actions.contains(&Action::CloseTransport));
    }

    #[test]
    fn keep_alive_missed_keeps_connection() {
        let (state, actions) = ConnectionState::Pairing.on_event(Event::KeepAliveMissed);
        assert_eq!(state, ConnectionState::Pairing);
        assert_eq!(actions, vec![Action::EmitEvent(ClientEvent::KeepAliveTimeout)]);

        let (state, actions) = ConnectionState::Disconnected.on_event(Event::KeepAliveMissed);
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn connection_lost_emits_disconnected() {
        for state in [
            ConnectionState::Handshaking,
            ConnectionState::Pairing,
            ConnectionState::Connected,
        ] {
            let (new_state, actions) = state.on_event(Event::ConnectionLost {
                reason: "stream end".into(),
            });
            assert_eq!(new_state, ConnectionState::Disconnected);
            assert_eq!(actions, vec![Action::EmitEvent(ClientEvent::Disconnected)]);
        }
    }

    #[test]
    fn connection_lost_after_user_disconnect_is_silent() {
        let (state, actions) = ConnectionState::Pairing.on_event(Event::DisconnectRequested);
        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(actions, vec![Action::CloseTransport]);

        // The transport noticing the close afterwards must not emit Disconnected
        let (state, actions) = state.on_event(Event::ConnectionLost {
            reason: "closed".into(),
        });
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn disconnect_request_while_disconnected_is_noop() {
        let (state, actions) = ConnectionState::Disconnected.on_event(Event::DisconnectRequested);
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn is_connected_helper() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Handshaking.is_connected());
        assert!(ConnectionState::Pairing.is_connected());
        assert!(ConnectionState::Connected.is_connected());
    }
}
