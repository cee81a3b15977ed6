//! Mock transport for testing.
//!
//! Allows queueing server frames and inspecting connection activity.

use super::{Transport, TransportError};
use async_trait::async_trait;
use link_types::ServerFrame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Frames are delivered by `recv()` in the order they were queued, each after
/// its optional delay. With nothing queued, `recv()` waits until a frame is
/// queued or the transport is closed.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    wakeup: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    connect_count: usize,
    close_count: usize,
    frames: VecDeque<QueuedFrame>,
    fail_next_connect: Option<String>,
    fail_next_recv: Option<TransportError>,
}

#[derive(Debug)]
struct QueuedFrame {
    delay: Duration,
    frame: ServerFrame,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a frame to be returned by a later `recv()` call.
    pub fn queue_frame(&self, frame: ServerFrame) {
        self.queue_frame_after(Duration::ZERO, frame);
    }

    /// Queue a frame that `recv()` returns only after waiting `delay`.
    ///
    /// The delay starts when `recv()` picks the frame up, i.e. after the
    /// previous frame has been delivered.
    pub fn queue_frame_after(&self, delay: Duration, frame: ServerFrame) {
        self.lock().frames.push_back(QueuedFrame { delay, frame });
        self.wakeup.notify_waiters();
    }

    /// Number of frames not yet delivered.
    pub fn pending_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        self.lock().connected_address.clone()
    }

    /// How many times `connect()` succeeded.
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    /// How many times `close()` was called.
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.lock().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.lock().fail_next_recv = Some(TransportError::ReceiveFailed(error.to_string()));
    }

    /// Cause the next recv() to time out.
    pub fn time_out_next_recv(&self) {
        self.lock().fail_next_recv = Some(TransportError::Timeout);
    }

    /// Clear all state (frames, counters, connection).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
        self.wakeup.notify_waiters();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            wakeup: Arc::clone(&self.wakeup),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connected_address = Some(address.to_string());
        inner.connect_count += 1;
        Ok(())
    }

    async fn recv(&self) -> Result<ServerFrame, TransportError> {
        loop {
            // Register interest before inspecting state so a close or a new
            // frame between the check and the await is not missed.
            let wakeup = self.wakeup.notified();
            tokio::pin!(wakeup);
            wakeup.as_mut().enable();

            let next = {
                let mut inner = self.lock();

                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(error);
                }
                if !inner.connected {
                    return Err(if inner.close_count > 0 {
                        TransportError::ConnectionClosed
                    } else {
                        TransportError::NotConnected
                    });
                }
                inner.frames.pop_front()
            };

            if let Some(queued) = next {
                if !queued.delay.is_zero() {
                    tokio::time::sleep(queued.delay).await;
                    if !self.is_connected() {
                        return Err(TransportError::ConnectionClosed);
                    }
                }
                return Ok(queued.frame);
            }

            wakeup.await;
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        {
            let mut inner = self.lock();
            inner.connected = false;
            inner.close_count += 1;
        }
        self.wakeup.notify_waiters();
        Ok(())
    }
}
