//! # link-types
//!
//! Shared value types for pairlink.
//!
//! This crate provides the foundational types used across all pairlink crates:
//! - [`DeviceId`] - Identity assigned to this device when pairing succeeds
//! - [`ClientEvent`] - Events dispatched on the client's event bus
//! - [`ServerFrame`] - Frames delivered by the transport layer
//! - [`QrChannelItem`] - Values written to a pairing stream
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod frames;
mod ids;
mod item;

pub use error::TypesError;
pub use events::{ClientEvent, PairSuccess, QrEvent};
pub use frames::ServerFrame;
pub use ids::DeviceId;
pub use item::QrChannelItem;
