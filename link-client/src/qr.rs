//! Pairing stream.
//!
//! [`Client::get_qr_channel`] hands out a bounded channel that carries the
//! pairing codes of the current batch, one at a time, each held for the
//! batch's code timeout. The channel ends with exactly one outcome
//! ([`QrChannelItem::Success`], [`QrChannelItem::Timeout`] or
//! [`QrChannelItem::UnexpectedEvent`]) and is closed right after it.
//!
//! # Event handling
//!
//! | Event                          | Effect                                     |
//! |--------------------------------|--------------------------------------------|
//! | `Qr`                           | stop the running emitter, start a new one  |
//! | `PairSuccess`                  | outcome `Success`                          |
//! | `Connected`, `ConnectFailure`  | outcome `UnexpectedEvent`                  |
//! | `Disconnected`                 | outcome `Timeout`                          |
//! | anything else                  | ignored                                    |
//!
//! An emitter that runs out of codes, or whose reader stops keeping up,
//! ends the stream with `Timeout` and disconnects the client. If the reader
//! drops its receiver the stream finishes quietly and the client is left
//! alone.
//!
//! One slot of the channel is kept free for the outcome, so finishing never
//! waits on the reader. This matters because finishing usually happens inside
//! an event handler, which must not block.

use link_core::{CloseLatch, CodeSequence};
use link_types::{ClientEvent, QrChannelItem, QrEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::bus::HandlerId;
use crate::client::{Client, ClientInner};
use crate::transport::Transport;

/// Channel slots held back for the outcome.
const TERMINAL_SLOTS: usize = 1;

/// Why a pairing stream could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QrChannelError {
    /// The stream must be requested before connecting.
    #[error("get_qr_channel must be called before connecting")]
    AlreadyConnected,

    /// This device is already paired.
    #[error("get_qr_channel can only be called when there's no device id in the store")]
    IdentityAlreadyStored,

    /// Code emitters run on Tokio; the stream was requested outside a runtime.
    #[error("get_qr_channel must be called from within a Tokio runtime")]
    NoRuntime,
}

impl<T: Transport> Client<T> {
    /// Open a pairing stream.
    ///
    /// Must be called before [`connect`](Client::connect) on a device with no
    /// stored identity. The returned receiver yields pairing codes followed by
    /// exactly one outcome, then `None`.
    ///
    /// Code emitters are spawned on the Tokio runtime this is awaited on.
    pub async fn get_qr_channel(&self) -> Result<mpsc::Receiver<QrChannelItem>, QrChannelError> {
        if self.is_connected().await {
            return Err(QrChannelError::AlreadyConnected);
        }
        if self.store().has_identity() {
            return Err(QrChannelError::IdentityAlreadyStored);
        }

        let runtime = Handle::try_current().map_err(|_| QrChannelError::NoRuntime)?;

        let buffer = self.config().qr_buffer.max(1) + TERMINAL_SLOTS;
        let (tx, rx) = mpsc::channel(buffer);

        let bus = &self.inner.bus;
        let handler_id = bus.next_handler_id();
        let relay = Arc::new(QrChannel {
            client: self.downgrade(),
            handler_id,
            closed: CloseLatch::new(),
            unsubscribed: AtomicBool::new(false),
            stop: CancellationToken::new(),
            emitter: Mutex::new(None),
            output: Mutex::new(Some(tx)),
            runtime,
        });
        bus.add_handler_with_id(handler_id, move |event| relay.handle_event(event));

        tracing::debug!(handler = handler_id.value(), "Opened pairing stream");
        Ok(rx)
    }
}

/// Outcome of one attempt to write a code.
enum Emit {
    Sent,
    Stopped,
    Full,
    Abandoned,
}

/// Relay between the event bus and one pairing stream.
struct QrChannel<T: Transport> {
    client: Weak<ClientInner<T>>,
    handler_id: HandlerId,
    closed: CloseLatch,
    unsubscribed: AtomicBool,
    /// Parent of every emitter token; cancelled once the stream finishes.
    stop: CancellationToken,
    /// Token of the emitter currently running, if any.
    emitter: Mutex<Option<CancellationToken>>,
    /// Taken (and dropped) when the outcome is written.
    output: Mutex<Option<mpsc::Sender<QrChannelItem>>>,
    runtime: Handle,
}

impl<T: Transport> QrChannel<T> {
    fn handle_event(self: &Arc<Self>, event: &ClientEvent) {
        match event {
            ClientEvent::Qr(qr) => self.start_emitter(qr),
            ClientEvent::PairSuccess(_) => {
                self.finish(QrChannelItem::Success);
            }
            ClientEvent::Connected | ClientEvent::ConnectFailure { .. } => {
                tracing::debug!(
                    handler = self.handler_id.value(),
                    "Got unexpected event while pairing: {:?}",
                    event
                );
                self.finish(QrChannelItem::UnexpectedEvent);
            }
            ClientEvent::Disconnected => {
                self.finish(QrChannelItem::Timeout);
            }
            ClientEvent::LoggedOut { .. } | ClientEvent::KeepAliveTimeout => {}
        }
    }

    fn start_emitter(self: &Arc<Self>, event: &QrEvent) {
        if self.closed.is_closed() {
            tracing::debug!(
                handler = self.handler_id.value(),
                "Ignoring pairing codes, stream is already closed"
            );
            return;
        }

        // A child of a cancelled token starts out cancelled, so an emitter
        // started while the stream finishes never writes.
        let token = self.stop.child_token();
        let previous = self
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            tracing::debug!(
                handler = self.handler_id.value(),
                "Replacing running code emitter"
            );
            previous.cancel();
        }

        tracing::debug!(
            handler = self.handler_id.value(),
            "Received {} pairing codes, starting to emit them",
            event.codes.len()
        );
        self.runtime
            .spawn(Arc::clone(self).emit_codes(token, CodeSequence::from(event)));
    }

    async fn emit_codes(self: Arc<Self>, token: CancellationToken, mut codes: CodeSequence) {
        loop {
            let Some(code) = codes.next_code() else {
                if token.is_cancelled() {
                    return;
                }
                tracing::debug!(handler = self.handler_id.value(), "Ran out of pairing codes");
                self.expire().await;
                return;
            };

            match self.emit_code(&token, code) {
                Emit::Sent => {
                    tracing::debug!(
                        handler = self.handler_id.value(),
                        "Emitted pairing code, {} left",
                        codes.remaining()
                    );
                }
                Emit::Stopped => {
                    tracing::debug!(
                        handler = self.handler_id.value(),
                        "Got signal to stop code emitter"
                    );
                    return;
                }
                Emit::Full => {
                    tracing::warn!(
                        handler = self.handler_id.value(),
                        "Pairing stream reader is not keeping up"
                    );
                    self.expire().await;
                    return;
                }
                Emit::Abandoned => {
                    tracing::debug!(
                        handler = self.handler_id.value(),
                        "Pairing stream reader went away"
                    );
                    self.finish(QrChannelItem::Timeout);
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(codes.timeout()) => {}
                _ = token.cancelled() => {
                    tracing::debug!(
                        handler = self.handler_id.value(),
                        "Got signal to stop code emitter"
                    );
                    return;
                }
            }
        }
    }

    /// Write one code unless this emitter was stopped.
    ///
    /// The stop check and the write happen under the output lock, so a code
    /// can never land after the outcome.
    fn emit_code(&self, token: &CancellationToken, code: String) -> Emit {
        let output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            return Emit::Stopped;
        }
        let Some(tx) = output.as_ref() else {
            return Emit::Stopped;
        };
        if tx.is_closed() {
            return Emit::Abandoned;
        }
        if tx.capacity() <= TERMINAL_SLOTS {
            return Emit::Full;
        }
        match tx.try_send(QrChannelItem::Code(code)) {
            Ok(()) => Emit::Sent,
            Err(TrySendError::Full(_)) => Emit::Full,
            Err(TrySendError::Closed(_)) => Emit::Abandoned,
        }
    }

    /// Finish with `Timeout` and, if that was the outcome, disconnect the client.
    async fn expire(&self) {
        if !self.finish(QrChannelItem::Timeout) {
            return;
        }
        let Some(inner) = self.client.upgrade() else {
            return;
        };
        if let Err(e) = Client::from_inner(inner).disconnect().await {
            tracing::warn!(
                handler = self.handler_id.value(),
                "Failed to disconnect after pairing timed out: {}",
                e
            );
        }
    }

    /// Stop emitting and, if nothing closed the stream yet, write `outcome`
    /// and close it. Returns true if `outcome` was written.
    fn finish(&self, outcome: QrChannelItem) -> bool {
        self.stop.cancel();

        let won = self.closed.try_close();
        if won {
            tracing::debug!(
                handler = self.handler_id.value(),
                "Closing pairing stream with status {}",
                outcome
            );
            self.close_output(outcome);
        } else {
            tracing::debug!(
                handler = self.handler_id.value(),
                "Got status {}, but pairing stream is already closed",
                outcome
            );
        }

        self.unsubscribe();
        won
    }

    /// Write the outcome and drop the sender, which closes the stream.
    fn close_output(&self, outcome: QrChannelItem) {
        let sender = self
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            if let Err(e) = tx.try_send(outcome) {
                tracing::debug!(
                    handler = self.handler_id.value(),
                    "Pairing outcome was not delivered: {}",
                    e
                );
            }
        }
    }

    fn unsubscribe(&self) {
        if self.unsubscribed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(client) = self.client.upgrade() {
            client.bus.remove_handler(self.handler_id);
        }
    }
}

impl<T: Transport> Drop for QrChannel<T> {
    // Only reached once the bus and every emitter let go, i.e. the client
    // is gone and no event can finish the stream any more.
    fn drop(&mut self) {
        if self.closed.try_close() {
            tracing::debug!(
                handler = self.handler_id.value(),
                "Client dropped with pairing stream open, closing with status timeout"
            );
            self.close_output(QrChannelItem::Timeout);
        }
    }
}
