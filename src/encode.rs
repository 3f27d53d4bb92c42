//! The streaming encoder (SPEC_FULL.md §4.3).
//!
//! Grounded on `original_source/pbs.go`'s `StreamEncode`: a synchronous
//! pass over singular fields in ascending field-number order, followed by
//! a fan-in over every repeated field's channel. The original uses
//! `reflect.Select` to multiplex Go channels onto one goroutine; here each
//! repeated field gets its own `tokio::spawn`'d task instead, serialized
//! onto the shared sink through an `Arc<tokio::sync::Mutex<W>>` — the same
//! "one writer task per stream, locked shared sink" shape as
//! `examples/appujet-baja/src/voice/gateway.rs`'s websocket writer.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;
use tracing::Instrument;

use crate::error::CodecError;
use crate::message::StreamMessage;
use crate::schema::FieldBinding;
use crate::varint::write_tag;

/// Flushes `message`'s current singular fields to `sink` in ascending
/// field-number order, then launches one background task per repeated
/// field and returns — matching the original implementation's
/// `StreamEncode`, which writes its synchronous prologue and then starts
/// its fan-in goroutine before returning `nil` (SPEC_FULL.md §4.3, §6).
///
/// If the prologue fails, that error is returned directly and no
/// repeated-field task is started. Once the prologue succeeds, `encode`
/// always returns `Ok(())`; any later failure in a background task is
/// deposited into the message's error sink instead, and that task alone
/// exits (others keep streaming until they too observe close or failure).
pub async fn encode<M, W>(sink: W, message: Arc<M>) -> Result<(), CodecError>
where
    M: StreamMessage,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let sink = Arc::new(AsyncMutex::new(sink));
    let descriptor = M::descriptor();

    // Singular prologue: ascending field order, written synchronously
    // before any repeated-field task starts, so a caller reading the
    // stream back-to-front sees singular fields first.
    for (field_number, binding) in descriptor.iter() {
        if let FieldBinding::Singular(s) = binding {
            if let Some(value) = (s.cell)(&message).get() {
                let mut buf = BytesMut::new();
                write_tag(field_number, s.kind.wire_type(), &mut buf);
                value.encode_payload(s.kind.wire_type(), &mut buf)?;
                let mut guard = sink.lock().await;
                guard.write_all(&buf).await.map_err(CodecError::from)?;
            }
        }
    }

    for (field_number, binding) in descriptor.iter() {
        if let FieldBinding::Repeated(r) = binding {
            let wire_type = r.kind.wire_type();
            let mut rx = (r.field)(&message).take_consumer();
            let sink = Arc::clone(&sink);
            let message = Arc::clone(&message);
            let span = tracing::info_span!(
                "encode_field",
                message_id = %message.core().id,
                field_number,
                ?wire_type
            );
            tokio::spawn(
                async move {
                    let result: Result<(), CodecError> = async {
                        while let Some(value) = rx.recv().await {
                            let mut buf = BytesMut::new();
                            write_tag(field_number, wire_type, &mut buf);
                            value.encode_payload(wire_type, &mut buf)?;
                            let mut guard = sink.lock().await;
                            guard.write_all(&buf).await.map_err(CodecError::from)?;
                        }
                        Ok(())
                    }
                    .await;
                    if let Err(e) = result {
                        message.core().errors.push(clone_error(&e));
                    }
                }
                .instrument(span),
            );
        }
    }

    Ok(())
}

/// `CodecError` has no `Clone` impl (its `Io`/`Marshal` variants box a
/// non-`Clone` error), so the error sink and the returned `Result` each
/// get their own instance built from the same classification.
fn clone_error(err: &CodecError) -> CodecError {
    match err {
        CodecError::Truncated => CodecError::Truncated,
        CodecError::Overflow => CodecError::Overflow,
        CodecError::SchemaMismatch(m) => CodecError::SchemaMismatch(m),
        CodecError::Closed => CodecError::Closed,
        CodecError::Marshal(e) => CodecError::Marshal(Box::new(std::io::Error::other(e.to_string()))),
        CodecError::Io(e) => CodecError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}
