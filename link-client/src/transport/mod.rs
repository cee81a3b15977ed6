//! Transport abstraction for pairlink.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (a real socket, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `recv()` yields the next decoded [`ServerFrame`]
//! - `close()` terminates; a parked `recv()` then returns
//!   [`TransportError::ConnectionClosed`]
//!
//! Framing, encryption and the handshake live below this trait.

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use link_types::ServerFrame;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,
}

/// Transport trait for receiving server frames.
///
/// Implementations handle the underlying connection mechanism.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect to the server at the given address.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Receive the next frame.
    ///
    /// Waits until a frame is available or the connection closes.
    async fn recv(&self) -> Result<ServerFrame, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&self) -> Result<(), TransportError>;
}
