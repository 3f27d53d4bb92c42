//! Message instances and their lifecycle (SPEC_FULL.md §3, §4.5).
//!
//! Grounded on `original_source/pbs.go`'s `StreamMessage` interface
//! (`Errors() chan error`, `Closed() <-chan struct{}`, `io.Closer`),
//! realized with Tokio primitives instead of raw Go channels: a
//! [`tokio_util::sync::CancellationToken`] for the close signal and a
//! [`std::sync::OnceLock`] for the single-slot error sink.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CodecError;
use crate::value::Value;

/// Default bound on a repeated field's channel — how many produced-but-
/// unsent (encode) or decoded-but-unconsumed (decode) elements may queue
/// before backpressure kicks in. Overridable per-field via
/// [`RepeatedField::with_capacity`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// An optional container for a singular field's value. Unset on encode
/// emits nothing on the wire; on decode, the last wire occurrence wins.
#[derive(Default)]
pub struct PresenceCell(Mutex<Option<Value>>);

impl PresenceCell {
    pub fn new() -> Self {
        Self(Mutex::new(None))
    }

    pub fn set(&self, value: Value) {
        *self.0.lock() = Some(value);
    }

    pub fn get(&self) -> Option<Value> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        *self.0.lock() = None;
    }
}

/// One repeated field's sequence endpoint. Owns both ends of a bounded
/// channel at construction; the active direction takes exclusive ownership
/// of the end it needs (a cloned [`mpsc::Sender`] for the producer side, a
/// one-time [`mpsc::Receiver`] take for the consumer side).
pub struct RepeatedField {
    capacity: usize,
    tx: Mutex<Option<mpsc::Sender<Value>>>,
    rx: Mutex<Option<mpsc::Receiver<Value>>>,
}

impl RepeatedField {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            capacity,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Takes the producer end. Used by callers pushing elements on the
    /// encode side; clone the returned `Sender` for concurrent producers
    /// (S3 pushes three fields concurrently this way). Exclusive ownership
    /// matters here, not just naming: if the field itself kept its own
    /// clone alive, the channel would never see every sender dropped, and
    /// an encoder task reading it would never observe end-of-stream.
    ///
    /// # Panics
    /// Panics if the sender end has already been taken.
    pub fn producer(&self) -> mpsc::Sender<Value> {
        self.tx.lock().take().expect("producer end already taken")
    }

    /// Takes the producer end, for the codec's exclusive use while
    /// decoding into this field.
    pub fn take_producer(&self) -> mpsc::Sender<Value> {
        self.tx
            .lock()
            .take()
            .expect("producer end already taken")
    }

    /// Takes the consumer end, for the codec's exclusive use while encoding
    /// from this field, or for the caller's use while reading decoded
    /// values.
    pub fn take_consumer(&self) -> mpsc::Receiver<Value> {
        self.rx
            .lock()
            .take()
            .expect("consumer end already taken")
    }

    /// Closes both ends (idempotent: taken/already-dropped ends are simply
    /// skipped).
    pub fn close(&self) {
        self.tx.lock().take();
        if let Some(mut rx) = self.rx.lock().take() {
            rx.close();
        }
    }

    /// Reinitializes both ends with a fresh channel of the same capacity.
    pub fn reset(&self) {
        let (tx, rx) = mpsc::channel(self.capacity.max(1));
        *self.tx.lock() = Some(tx);
        *self.rx.lock() = Some(rx);
    }
}

impl Default for RepeatedField {
    fn default() -> Self {
        Self::new()
    }
}

/// The message's close signal. Wraps a [`CancellationToken`] behind a lock
/// so `reset()` can install a fresh, uncancelled token — a `CancellationToken`
/// itself can never be un-cancelled once fired.
pub struct CloseSignal(Mutex<CancellationToken>);

impl CloseSignal {
    fn new() -> Self {
        Self(Mutex::new(CancellationToken::new()))
    }

    pub fn cancel(&self) {
        self.0.lock().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.lock().is_cancelled()
    }

    /// Waits for the current epoch's cancellation. Clones the token out from
    /// under the lock before awaiting, so the `parking_lot` guard never
    /// crosses a suspension point.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFutureOwned {
        self.0.lock().clone().cancelled_owned()
    }

    /// Installs a fresh token so a reset message reports itself as open
    /// again. Only called while the message is already closed (§4.5).
    fn rearm(&self) {
        *self.0.lock() = CancellationToken::new();
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The single-slot error sink (SPEC_FULL.md §3): the first terminal error
/// observed by the codec is retained; later ones are dropped.
#[derive(Default)]
pub struct ErrorSink(OnceLock<Arc<CodecError>>);

impl ErrorSink {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Deposits `err` if the slot is empty. Never blocks; a second error
    /// after the first is silently dropped.
    pub fn push(&self, err: CodecError) {
        let _ = self.0.set(Arc::new(err));
    }

    pub fn get(&self) -> Option<Arc<CodecError>> {
        self.0.get().cloned()
    }
}

/// The per-message-instance state every streaming message embeds: its
/// close signal and error sink (SPEC_FULL.md §3), plus an identifier that
/// ties together the `tracing` spans of its concurrent per-field encode
/// or decode tasks.
pub struct MessageCore {
    pub id: uuid::Uuid,
    pub close: CloseSignal,
    pub errors: ErrorSink,
}

impl Default for MessageCore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCore {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            close: CloseSignal::new(),
            errors: ErrorSink::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }
}

/// A message type whose schema descriptor and per-field bindings are known
/// statically (SPEC_FULL.md §3, §9: "compile-time generated bindings").
///
/// Implementations are typically produced by the `protogen` collaborator
/// (`src/protogen`), but may equally well be hand-written, as the fixtures
/// under `tests/` are.
pub trait StreamMessage: Send + Sync + 'static {
    fn descriptor() -> &'static crate::schema::Descriptor<Self>
    where
        Self: Sized;

    fn core(&self) -> &MessageCore;

    /// Closes the message: every repeated field's sequence, the close
    /// signal, and (implicitly, since it is now unreachable) the error
    /// sink. Idempotent.
    fn close(&self)
    where
        Self: Sized,
    {
        for (_, binding) in Self::descriptor().iter() {
            if let crate::schema::FieldBinding::Repeated(r) = binding {
                (r.field)(self).close();
            }
        }
        self.core().close.cancel();
    }

    /// Clears every singular cell and reinitializes every repeated field's
    /// channel. Only valid while the message is closed.
    fn reset(&self) -> Result<(), CodecError>
    where
        Self: Sized,
    {
        if !self.core().is_closed() {
            return Err(CodecError::Closed);
        }
        for (_, binding) in Self::descriptor().iter() {
            match binding {
                crate::schema::FieldBinding::Singular(s) => (s.cell)(self).clear(),
                crate::schema::FieldBinding::Repeated(r) => (r.field)(self).reset(),
            }
        }
        self.core().close.rearm();
        Ok(())
    }
}
