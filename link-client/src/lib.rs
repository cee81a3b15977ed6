//! # link-client
//!
//! Client library for pairlink.
//!
//! This is the library applications use to pair a device with a phone.
//!
//! ## Features
//!
//! - **Pairing stream**: [`Client::get_qr_channel`] returns a channel of pairing
//!   codes that ends with exactly one outcome
//! - **Event bus**: handlers subscribe to [`ClientEvent`]s and may remove themselves
//! - **Transport Abstraction**: Pluggable transport layer (mock included)
//! - **Pure State Machine**: Uses link-core for side-effect-free connection logic
//!
//! ## Example
//!
//! ```ignore
//! use link_client::{Client, ClientConfig, MemoryStore, MockTransport, QrChannelItem};
//!
//! let client = Client::new(ClientConfig::new("pair.example.net"), transport, store);
//! let mut qr = client.get_qr_channel().await?;
//! client.connect().await?;
//!
//! while let Some(item) = qr.recv().await {
//!     match item {
//!         QrChannelItem::Code(code) => render(&code),
//!         outcome => println!("pairing finished: {}", outcome),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod client;
pub mod qr;
pub mod store;
pub mod transport;

pub use bus::{EventBus, HandlerId};
pub use client::{Client, ClientConfig, ClientError, DEFAULT_QR_BUFFER};
pub use link_types::{ClientEvent, DeviceId, PairSuccess, QrChannelItem, QrEvent, ServerFrame};
pub use qr::QrChannelError;
pub use store::{DeviceStore, MemoryStore};
pub use transport::{MockTransport, Transport, TransportError};
