//! # link-core
//!
//! Pure logic for pairlink (no I/O, instant tests).
//!
//! This crate implements the state machine and primitives behind pairing
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`ConnectionState`] maps connection events to a new state plus actions
//! - [`CodeSequence`] hands out pairing codes front to back
//! - [`CloseLatch`] decides, atomically, who gets to close a pairing stream
//!
//! The actual I/O (transport, event dispatch, timers) is performed by
//! `link-client`, which interprets what these produce.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codes;
pub mod latch;
pub mod state;

pub use codes::CodeSequence;
pub use latch::CloseLatch;
pub use state::{Action, ConnectionState, Event};
