//! Write buffer and read cursor for the binary key format
//!
//! [`ByteBuffer`] is append-only and owns its bytes. [`ByteCursor`] borrows a
//! byte slice and tracks a read position plus a soft end boundary, so an
//! embedded message can be read without slicing the input.

use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::varint;

/// Append-only byte sequence with varint and string helpers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a varint restricted to the signed 32-bit range
    pub fn add_var_int32(&mut self, value: i64) -> EncodeResult<()> {
        varint::encode_int32(value, &mut self.bytes)
    }

    /// Append a varint over the signed 64-bit range
    pub fn add_var_int64(&mut self, value: i64) {
        varint::encode_int64(value, &mut self.bytes);
    }

    /// Append the UTF-8 byte length of `s` followed by its bytes
    pub fn add_prefixed_string(&mut self, s: &str) -> EncodeResult<()> {
        let len = i64::try_from(s.len()).unwrap_or(i64::MAX);
        self.add_var_int32(len)?;
        self.bytes.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the written bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Bounds-checked reader over a borrowed byte slice
///
/// `end` starts at the slice length. [`ByteCursor::set_end`] narrows it to
/// the next `n` bytes while an embedded message is read and restores it
/// afterwards.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    idx: usize,
    end: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            idx: 0,
            end: data.len(),
        }
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.idx
    }

    /// Current soft end boundary
    pub fn end(&self) -> usize {
        self.end
    }

    /// True while the read position is before the current end
    pub fn has_remaining(&self) -> bool {
        self.idx < self.end
    }

    /// Scope reads to the next `n` bytes, or restore the full length with `None`
    ///
    /// Fails with [`DecodeError::Truncated`] if fewer than `n` bytes are left
    /// in the underlying slice.
    pub fn set_end(&mut self, n: Option<usize>) -> DecodeResult<()> {
        self.end = match n {
            None => self.data.len(),
            Some(n) => {
                let end = self.idx.checked_add(n).ok_or(DecodeError::Truncated)?;
                if end > self.data.len() {
                    return Err(DecodeError::Truncated);
                }
                end
            }
        };
        Ok(())
    }

    /// Read a single byte
    pub fn get8(&mut self) -> DecodeResult<u8> {
        if !self.has_remaining() {
            return Err(DecodeError::Truncated);
        }
        let byte = *self.data.get(self.idx).ok_or(DecodeError::Truncated)?;
        self.idx += 1;
        Ok(byte)
    }

    /// Read a varint in the signed 32-bit range
    pub fn get_var_int32(&mut self) -> DecodeResult<i32> {
        varint::decode_int32(self)
    }

    /// Read a varint in the signed 64-bit range
    pub fn get_var_int64(&mut self) -> DecodeResult<i64> {
        varint::decode_int64(self)
    }

    /// Read a varint length followed by that many UTF-8 bytes
    pub fn get_prefixed_string(&mut self) -> DecodeResult<String> {
        let len = self.get_var_int32()?;
        let len = usize::try_from(len)
            .map_err(|_| DecodeError::corrupted(format!("negative string length {}", len)))?;
        if len > self.end - self.idx {
            return Err(DecodeError::Truncated);
        }
        let raw = &self.data[self.idx..self.idx + len];
        self.idx += len;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}
