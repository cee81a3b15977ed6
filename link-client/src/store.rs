//! Device identity storage.
//!
//! The client only needs to know whether this device already has an identity
//! and to record the one it receives when pairing succeeds. Durable storage
//! is left to the application (the CLI persists a [`MemoryStore`] to disk).

use link_types::DeviceId;
use std::sync::{PoisonError, RwLock};

/// Where the client keeps its device identity.
pub trait DeviceStore: Send + Sync {
    /// The stored identity, if any.
    fn device_id(&self) -> Option<DeviceId>;

    /// Replace the stored identity.
    fn set_device_id(&self, id: Option<DeviceId>);

    /// Check whether an identity is already stored.
    fn has_identity(&self) -> bool {
        self.device_id().is_some()
    }
}

/// In-process device store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    device_id: RwLock<Option<DeviceId>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds an identity.
    pub fn with_device_id(id: DeviceId) -> Self {
        Self {
            device_id: RwLock::new(Some(id)),
        }
    }
}

impl DeviceStore for MemoryStore {
    fn device_id(&self) -> Option<DeviceId> {
        *self.device_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_device_id(&self, id: Option<DeviceId>) {
        *self
            .device_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }
}
