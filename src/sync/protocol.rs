//! Frame header decoding and room seeding for the sync relay.
//!
//! Frames are opaque to the server apart from their leading varint, which
//! names the message kind. The only frame the server ever builds is the
//! seed frame that loads a shared document into a fresh room.

use bytes::{BufMut, Bytes, BytesMut};

/// Name of the shared text type the client editor binds to.
pub const SHARED_TEXT_FIELD: &str = "shared-text";

/// Sync sub-message carrying a document update.
const SYNC_UPDATE: u64 = 2;

/// Fixed update header: struct count, client id, clock, item info and
/// parent type marker of the single inserted string item.
const UPDATE_HEADER: &[u8] = &[1, 1, 196, 248, 225, 213, 10, 0, 4, 1];

/// Empty delete set terminating the update.
const UPDATE_TRAILER: &[u8] = &[10, 0];

/// Errors decoding a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The varint does not fit in 64 bits.
    #[error("varint overflows 64 bits")]
    Overflow,

    /// The frame ended inside the varint.
    #[error("frame too short for varint")]
    Truncated,
}

/// Message kind carried in the first varint of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Document state or update. The latest one becomes the room state.
    Sync,
    /// Presence (cursors, user names).
    Awareness,
    /// Authentication exchange.
    Auth,
    /// Request for everyone's presence.
    QueryAwareness,
    /// Any other kind; relayed unchanged.
    Other(u64),
}

impl From<u64> for MessageKind {
    fn from(value: u64) -> Self {
        match value {
            0 => Self::Sync,
            1 => Self::Awareness,
            2 => Self::Auth,
            3 => Self::QueryAwareness,
            other => Self::Other(other),
        }
    }
}

impl MessageKind {
    /// Decodes the kind of `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the leading varint is malformed.
    pub fn of(frame: &[u8]) -> Result<Self, FrameError> {
        read_var_uint(frame).map(|(value, _)| Self::from(value))
    }
}

/// Reads an unsigned LEB128 varint, returning the value and the number of
/// bytes consumed.
///
/// # Errors
///
/// [`FrameError::Overflow`] past 64 bits, [`FrameError::Truncated`] when
/// the input ends before the last byte.
pub fn read_var_uint(data: &[u8]) -> Result<(u64, usize), FrameError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if byte < 0x80 {
            if i > 9 || (i == 9 && byte > 1) {
                return Err(FrameError::Overflow);
            }
            return Ok((value | (u64::from(byte) << shift), i + 1));
        }
        if i >= 9 {
            return Err(FrameError::Overflow);
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(FrameError::Truncated)
}

/// Appends `value` as an unsigned LEB128 varint.
pub fn write_var_uint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Builds the sync frame that initializes a room with `content` as the
/// [`SHARED_TEXT_FIELD`] text.
#[must_use]
pub fn seed_frame(content: &str) -> Bytes {
    let mut update = BytesMut::with_capacity(content.len() + 32);
    update.put_slice(UPDATE_HEADER);
    write_var_uint(&mut update, SHARED_TEXT_FIELD.len() as u64);
    update.put_slice(SHARED_TEXT_FIELD.as_bytes());
    write_var_uint(&mut update, content.len() as u64);
    update.put_slice(content.as_bytes());
    update.put_slice(UPDATE_TRAILER);

    let mut frame = BytesMut::with_capacity(update.len() + 12);
    write_var_uint(&mut frame, 0);
    write_var_uint(&mut frame, SYNC_UPDATE);
    write_var_uint(&mut frame, update.len() as u64);
    frame.put_slice(&update);
    frame.freeze()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_var_uint(&mut buf, value);
        buf
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(encode(0), [0]);
        assert_eq!(encode(127), [127]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(300), [0xac, 0x02]);
        assert_eq!(encode(u64::MAX).len(), 10);
    }

    #[test]
    fn varint_reads_back() {
        for value in [0, 1, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
            let bytes = encode(value);
            assert_eq!(read_var_uint(&bytes), Ok((value, bytes.len())));
        }
    }

    #[test]
    fn varint_ignores_trailing_bytes() {
        assert_eq!(read_var_uint(&[0x05, 0xff, 0xff]), Ok((5, 1)));
    }

    #[test]
    fn varint_errors() {
        assert_eq!(read_var_uint(&[]), Err(FrameError::Truncated));
        assert_eq!(read_var_uint(&[0x80, 0x80]), Err(FrameError::Truncated));
        let mut too_long = vec![0xff; 9];
        too_long.push(0x02);
        assert_eq!(read_var_uint(&too_long), Err(FrameError::Overflow));
        assert_eq!(read_var_uint(&[0x80; 11]), Err(FrameError::Overflow));
    }

    #[test]
    fn message_kinds() {
        assert_eq!(MessageKind::of(&[0, 1, 2]), Ok(MessageKind::Sync));
        assert_eq!(MessageKind::of(&[1]), Ok(MessageKind::Awareness));
        assert_eq!(MessageKind::of(&[2]), Ok(MessageKind::Auth));
        assert_eq!(MessageKind::of(&[3]), Ok(MessageKind::QueryAwareness));
        assert_eq!(MessageKind::of(&[9]), Ok(MessageKind::Other(9)));
        assert!(MessageKind::of(&[]).is_err());
    }

    #[test]
    fn seed_frame_layout() {
        let frame = seed_frame("hi");
        assert_eq!(MessageKind::of(&frame), Ok(MessageKind::Sync));
        assert_eq!(frame[1], 2);

        let Ok((len, used)) = read_var_uint(&frame[2..]) else {
            panic!("length varint");
        };
        let body = &frame[2 + used..];
        assert_eq!(len as usize, body.len());
        assert_eq!(&body[..10], UPDATE_HEADER);
        assert_eq!(body[10], 11);
        assert_eq!(&body[11..22], b"shared-text");
        assert_eq!(body[22], 2);
        assert_eq!(&body[23..25], b"hi");
        assert_eq!(&body[25..], UPDATE_TRAILER);
    }

    #[test]
    fn seed_frame_long_content_uses_multibyte_lengths() {
        let content = "x".repeat(200);
        let frame = seed_frame(&content);
        // 10 header + 1 + 11 + 2 (varint 200) + 200 + 2 trailer
        assert_eq!(&frame[..4], &[0, 2, 0xe2, 0x01]);
        assert_eq!(frame.len(), 4 + 226);
    }
}
