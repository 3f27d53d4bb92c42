//! The streaming decoder (SPEC_FULL.md §4.4).
//!
//! Grounded on `original_source/pbs.go`'s `StreamDecode`: read a tag, look
//! the field number up in the schema, dispatch the payload to a presence
//! cell or a channel send, repeat until a clean EOF. Unknown field numbers
//! are read and discarded rather than rejected, matching the original's
//! forward-compatible behavior.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use tracing::Instrument;

use crate::error::CodecError;
use crate::message::StreamMessage;
use crate::schema::{FieldBinding, WireType};
use crate::value::Value;
use crate::varint::read_varint_async;

/// Reads exactly `buf.len()` bytes, mapping a clean EOF partway through into
/// `Truncated` rather than letting it surface as `CodecError::Io` — the tag
/// and varint readers already draw this distinction (see
/// `read_varint_byte` in `varint.rs`); length-delimited payloads need the
/// same treatment since `AsyncReadExt::read_exact` otherwise reports
/// `UnexpectedEof` as a bare I/O error.
async fn read_exact_or_truncated<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    match source.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(CodecError::Truncated),
        Err(e) => Err(CodecError::Io(e)),
    }
}

/// Reads and discards a frame's payload without a schema binding to guide
/// it — `wire_type` alone is enough to know how many bytes to skip.
async fn skip_unknown_field<R: AsyncRead + Unpin>(
    source: &mut R,
    wire_type: WireType,
    max_payload_len: u64,
) -> Result<(), CodecError> {
    match wire_type {
        WireType::Varint => {
            read_varint_async(source, false).await?;
        }
        WireType::LengthDelimited => {
            let len = read_varint_async(source, false).await?.unwrap_or(0);
            if len > max_payload_len {
                return Err(CodecError::Overflow);
            }
            let mut discard = vec![0u8; len as usize];
            read_exact_or_truncated(source, &mut discard).await?;
        }
    }
    Ok(())
}

/// Reads a length-delimited frame's payload bytes, enforcing
/// `max_payload_len` as the overflow ceiling.
async fn read_length_delimited<R: AsyncRead + Unpin>(
    source: &mut R,
    max_payload_len: u64,
) -> Result<Bytes, CodecError> {
    let len = read_varint_async(source, false).await?.unwrap_or(0);
    if len > max_payload_len {
        return Err(CodecError::Overflow);
    }
    let mut buf = BytesMut::zeroed(len as usize);
    read_exact_or_truncated(source, &mut buf).await?;
    Ok(buf.freeze())
}

/// Spawns a background task that decodes `source` into `message`'s presence
/// cells and repeated-field channels until a clean end of stream, then
/// closes the message. Returns as soon as that task is launched — matching
/// the original implementation's `StreamDecode`, which starts its decode
/// goroutine and returns `nil` immediately (SPEC_FULL.md §4.4, §6); callers
/// observe completion via `message.core().close` and any terminal error via
/// `message.core().errors`.
///
/// `max_payload_len` bounds any single length-delimited frame (see
/// SPEC_FULL.md §10's `limits.max_payload_len`); frames declaring a larger
/// length are rejected with [`CodecError::Overflow`] before the payload is
/// read, so a corrupt length prefix can't force an unbounded allocation.
///
/// Sending a decoded element into a repeated field inherits that channel's
/// backpressure: a slow or absent consumer stalls the background task, not
/// this function.
pub async fn decode<M, R>(mut source: R, message: Arc<M>, max_payload_len: u64) -> Result<(), CodecError>
where
    M: StreamMessage,
    R: AsyncRead + Unpin + Send + 'static,
{
    let descriptor = M::descriptor();

    let mut producers: HashMap<u32, mpsc::Sender<Value>> = HashMap::new();
    for (field_number, binding) in descriptor.iter() {
        if let FieldBinding::Repeated(r) = binding {
            producers.insert(field_number, (r.field)(&message).take_producer());
        }
    }

    let span = tracing::info_span!("decode_message", message_id = %message.core().id);
    tokio::spawn(
        async move {
            let result = decode_loop(&mut source, &message, &producers, max_payload_len).await;
            if let Err(ref err) = result {
                message.core().errors.push(clone_error(err));
            }
            message.close();
        }
        .instrument(span),
    );

    Ok(())
}

async fn decode_loop<M, R>(
    source: &mut R,
    message: &Arc<M>,
    producers: &HashMap<u32, mpsc::Sender<Value>>,
    max_payload_len: u64,
) -> Result<(), CodecError>
where
    M: StreamMessage,
    R: AsyncRead + Unpin,
{
    let descriptor = M::descriptor();

    loop {
        let Some((field_number, wire_type)) = crate::varint::read_tag_async(source, true).await? else {
            return Ok(());
        };

        let Some(binding) = descriptor.get(field_number) else {
            skip_unknown_field(source, wire_type, max_payload_len).await?;
            continue;
        };

        if binding.wire_type() != wire_type {
            return Err(CodecError::SchemaMismatch(
                "wire type on the frame does not match the field's declared kind",
            ));
        }

        let value = match wire_type {
            WireType::Varint => {
                let raw = read_varint_async(source, false).await?.unwrap_or(0);
                Value::from_varint(binding.kind(), raw)?
            }
            WireType::LengthDelimited => {
                let bytes = read_length_delimited(source, max_payload_len).await?;
                Value::from_length_delimited(binding.kind(), bytes)?
            }
        };

        match binding {
            FieldBinding::Singular(s) => (s.cell)(message).set(value),
            FieldBinding::Repeated(_) => {
                let tx = producers
                    .get(&field_number)
                    .expect("every repeated binding has a retained producer");
                if tx.send(value).await.is_err() {
                    // consumer dropped its receiver; the field is simply
                    // no longer being read, not a decode failure.
                }
            }
        }
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageCore, PresenceCell, RepeatedField};
    use crate::schema::{Descriptor, ElementKind, RepeatedBinding, SingularBinding};
    use std::collections::BTreeMap;
    use std::sync::OnceLock;

    struct Fixture {
        core: MessageCore,
        name: PresenceCell,
        tags: RepeatedField,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                core: MessageCore::new(),
                name: PresenceCell::new(),
                tags: RepeatedField::new(),
            }
        }
    }

    impl StreamMessage for Fixture {
        fn descriptor() -> &'static Descriptor<Self> {
            static DESC: OnceLock<Descriptor<Fixture>> = OnceLock::new();
            DESC.get_or_init(|| {
                let mut fields = BTreeMap::new();
                fields.insert(
                    1,
                    FieldBinding::Singular(SingularBinding {
                        kind: ElementKind::String,
                        cell: |m: &Fixture| &m.name,
                    }),
                );
                fields.insert(
                    2,
                    FieldBinding::Repeated(RepeatedBinding {
                        kind: ElementKind::String,
                        field: |m: &Fixture| &m.tags,
                    }),
                );
                Descriptor::new(fields)
            })
        }

        fn core(&self) -> &MessageCore {
            &self.core
        }
    }

    /// `decode` only launches the background task; this bounds the wait for
    /// it to finish so a broken test hangs instead of the whole suite.
    async fn wait_closed(fixture: &Arc<Fixture>) {
        tokio::time::timeout(std::time::Duration::from_secs(5), fixture.core().close.cancelled())
            .await
            .expect("decode task did not close the message in time");
    }

    #[tokio::test]
    async fn decodes_singular_then_repeated_and_closes() {
        let mut bytes = vec![0x0a, 4];
        bytes.extend_from_slice(b"room");
        bytes.extend_from_slice(&[0x12, 1, b'a']);
        bytes.extend_from_slice(&[0x12, 1, b'b']);

        let fixture = Arc::new(Fixture::new());
        let mut rx = fixture.tags.take_consumer();

        let cursor = std::io::Cursor::new(bytes);
        decode(cursor, Arc::clone(&fixture), 64 * 1024 * 1024)
            .await
            .unwrap();

        // Recv synchronizes with the background task's progress: by the
        // time an element arrives, the singular field that preceded it on
        // the wire has already been set.
        assert_eq!(rx.recv().await, Some(Value::string("a")));
        assert_eq!(fixture.name.get(), Some(Value::string("room")));
        assert_eq!(rx.recv().await, Some(Value::string("b")));
        assert_eq!(rx.recv().await, None);
        wait_closed(&fixture).await;
        assert!(fixture.core().is_closed());
    }

    #[tokio::test]
    async fn unknown_field_is_skipped_not_rejected() {
        // field 99, length-delimited, 3-byte payload, then our known field 1.
        let mut buf = BytesMut::new();
        crate::varint::write_tag(99, WireType::LengthDelimited, &mut buf);
        crate::varint::write_varint(3, &mut buf);
        buf.extend_from_slice(b"xyz");
        buf.extend_from_slice(&[0x0a, 2, b'h', b'i']);

        let fixture = Arc::new(Fixture::new());
        let cursor = std::io::Cursor::new(buf.to_vec());
        decode(cursor, Arc::clone(&fixture), 64 * 1024 * 1024)
            .await
            .unwrap();
        wait_closed(&fixture).await;
        assert_eq!(fixture.name.get(), Some(Value::string("hi")));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_overflow() {
        // A length prefix claiming 10 MiB, far past our 16-byte test ceiling.
        let mut len_buf = bytes::BytesMut::new();
        crate::varint::write_varint(10 * 1024 * 1024, &mut len_buf);
        let mut frame = vec![0x0a];
        frame.extend_from_slice(&len_buf);

        let fixture = Arc::new(Fixture::new());
        let cursor = std::io::Cursor::new(frame);
        decode(cursor, Arc::clone(&fixture), 16).await.unwrap();
        wait_closed(&fixture).await;
        let err = fixture.core().errors.get().expect("decode should have recorded an error");
        assert!(matches!(*err, CodecError::Overflow));
    }

    #[tokio::test]
    async fn truncated_stream_mid_payload_is_truncated() {
        let bytes = vec![0x0a, 10, b'o', b'n', b'l', b'y']; // declares 10, gives 4
        let fixture = Arc::new(Fixture::new());
        let cursor = std::io::Cursor::new(bytes);
        decode(cursor, Arc::clone(&fixture), 64 * 1024 * 1024)
            .await
            .unwrap();
        wait_closed(&fixture).await;
        let err = fixture.core().errors.get().expect("decode should have recorded an error");
        assert!(matches!(*err, CodecError::Truncated));
        assert!(fixture.core().is_closed());
    }
}
