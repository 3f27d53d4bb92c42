//! Base-128 varint and protobuf tag encoding (SPEC_FULL.md §4.1).
//!
//! Grounded on `original_source/pbs.go`'s `readVarint`/`writeTag`, with the
//! two fixes the spec calls out: the accumulator shifts in 64-bit width and
//! the reader supports the full 10 bytes a sign-extended 64-bit varint needs,
//! instead of capping at four.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::CodecError;
use crate::schema::WireType;

/// Maximum bytes a base-128 varint needs to hold a full 64-bit payload:
/// `ceil(64 / 7) == 10`.
const MAX_VARINT_BYTES: usize = 10;

/// Appends `value` to `buf` as a base-128 little-endian varint.
pub fn write_varint(mut value: u64, buf: &mut BytesMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Appends `value` to `buf` as a varint, sign-extended to 64 bits first —
/// standard proto2 `int32`/`int64` encoding (not zigzag), so `-1` occupies
/// the full 10 bytes.
pub fn write_signed_varint(value: i64, buf: &mut BytesMut) {
    write_varint(value as u64, buf);
}

/// Writes a protobuf tag byte (or multi-byte varint tag for field numbers
/// `>= 16`) for `(field_number, wire_type)`.
pub fn write_tag(field_number: u32, wire_type: WireType, buf: &mut BytesMut) {
    let tag = ((field_number as u64) << 3) | (wire_type as u64);
    write_varint(tag, buf);
}

/// Reads a tag varint and splits it into `(field_number, wire_type)`.
pub fn decode_tag(tag: u64) -> Result<(u32, WireType), CodecError> {
    let wire_type = WireType::from_u8((tag & 0x7) as u8)?;
    Ok(((tag >> 3) as u32, wire_type))
}

/// Reads one byte from `r`, distinguishing a clean end-of-stream (when
/// `allow_eof` is set and this is the very first byte read) from an
/// unexpected one.
async fn read_varint_byte<R: AsyncRead + Unpin>(
    r: &mut R,
    first: bool,
    allow_eof: bool,
) -> Result<Option<u8>, CodecError> {
    let mut byte = [0u8; 1];
    let n = r.read(&mut byte).await?;
    if n == 0 {
        if first && allow_eof {
            return Ok(None);
        }
        return Err(CodecError::Truncated);
    }
    Ok(Some(byte[0]))
}

/// Reads a varint from an async byte source.
///
/// When `allow_eof` is true and the stream ends cleanly before any byte of
/// this varint is read, returns `Ok(None)` — the "clean end of stream before
/// any tag" case of SPEC_FULL.md §4.4. Any other truncation is `Truncated`.
pub async fn read_varint_async<R: AsyncRead + Unpin>(
    r: &mut R,
    allow_eof: bool,
) -> Result<Option<u64>, CodecError> {
    let mut result: u64 = 0;
    for i in 0..MAX_VARINT_BYTES {
        let Some(byte) = read_varint_byte(r, i == 0, allow_eof).await? else {
            return Ok(None);
        };
        let continues = byte & 0x80 != 0;
        let payload = (byte & 0x7f) as u64;
        if i == MAX_VARINT_BYTES - 1 && continues {
            return Err(CodecError::Overflow);
        }
        result |= payload << (7 * i);
        if !continues {
            return Ok(Some(result));
        }
    }
    Err(CodecError::Overflow)
}

/// Reads a protobuf tag from an async byte source, honoring the same clean-
/// EOF contract as [`read_varint_async`].
pub async fn read_tag_async<R: AsyncRead + Unpin>(
    r: &mut R,
    allow_eof: bool,
) -> Result<Option<(u32, WireType)>, CodecError> {
    let Some(tag) = read_varint_async(r, allow_eof).await? else {
        return Ok(None);
    };
    decode_tag(tag).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        write_varint(value, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn small_values_fit_one_byte() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7f]);
    }

    #[test]
    fn continuation_bit_set_across_bytes() {
        assert_eq!(encode(300), vec![0xac, 0x02]);
    }

    #[test]
    fn negative_int64_occupies_ten_bytes() {
        let mut buf = BytesMut::new();
        write_signed_varint(-1, &mut buf);
        assert_eq!(buf.len(), 10);
        assert_eq!(
            buf.to_vec(),
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn negative_195_matches_known_wire_bytes() {
        // S2 from SPEC_FULL.md §8.
        let mut buf = BytesMut::new();
        write_signed_varint(-195, &mut buf);
        assert_eq!(
            buf.to_vec(),
            vec![0xBD, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[tokio::test]
    async fn round_trips_through_async_reader() {
        let mut buf = BytesMut::new();
        write_varint(u64::MAX, &mut buf);
        let mut cursor = std::io::Cursor::new(buf.to_vec());
        let value = read_varint_async(&mut cursor, false).await.unwrap();
        assert_eq!(value, Some(u64::MAX));
    }

    #[tokio::test]
    async fn clean_eof_before_any_byte_is_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let value = read_varint_async(&mut cursor, true).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn eof_mid_varint_is_truncated() {
        // First three bytes of -195's encoding, then nothing.
        let mut cursor = std::io::Cursor::new(vec![0xBD, 0xFE, 0xFF]);
        let err = read_varint_async(&mut cursor, true).await.unwrap_err();
        assert!(matches!(err, CodecError::Truncated));
    }

    #[tokio::test]
    async fn eleventh_continuation_byte_is_overflow() {
        let bytes = vec![0xffu8; 11];
        let mut cursor = std::io::Cursor::new(bytes);
        let err = read_varint_async(&mut cursor, false).await.unwrap_err();
        assert!(matches!(err, CodecError::Overflow));
    }

    #[test]
    fn tag_round_trips_for_large_field_numbers() {
        // S6 from SPEC_FULL.md §8: field number 200, length-delimited.
        let mut buf = BytesMut::new();
        write_tag(200, WireType::LengthDelimited, &mut buf);
        assert_eq!(buf.len(), 2);
        let tag = encode(((200u64) << 3) | 2);
        assert_eq!(buf.to_vec(), tag);

        let mut value: u64 = 0;
        for (i, byte) in buf.iter().enumerate() {
            value |= ((byte & 0x7f) as u64) << (7 * i);
        }
        let (field_number, wire_type) = decode_tag(value).unwrap();
        assert_eq!(field_number, 200);
        assert_eq!(wire_type, WireType::LengthDelimited);
    }
}
