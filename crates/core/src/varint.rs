//! Varint codec
//!
//! Signed integers are written as 7-bit groups, low-order first, with the
//! high bit of each byte set while more bytes follow. Negative values are
//! taken modulo 2^64 first, so they always occupy ten bytes.
//!
//! ```text
//! 0      -> 00
//! 127    -> 7F
//! 128    -> 80 01
//! -1     -> FF FF FF FF FF FF FF FF FF 01
//! ```

use crate::buffer::ByteCursor;
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

/// Continuation bit
const MORE: u8 = 0x80;
/// Payload mask
const PAYLOAD: u8 = 0x7F;
/// A varint longer than this many bits is corrupt
const MAX_SHIFT: u32 = 64;

/// Append `value` as a varint constrained to the signed 32-bit range.
pub fn encode_int32(value: i64, out: &mut Vec<u8>) -> EncodeResult<()> {
    if (0..=127).contains(&value) {
        out.push(value as u8);
        return Ok(());
    }
    if value < i64::from(i32::MIN) || value > i64::from(i32::MAX) {
        return Err(EncodeError::Overflow { value, bits: 32 });
    }
    write_groups(value as u64, out);
    Ok(())
}

/// Append `value` as a varint over the full signed 64-bit range.
///
/// Every `i64` is in range, so this cannot overflow.
pub fn encode_int64(value: i64, out: &mut Vec<u8>) {
    write_groups(value as u64, out);
}

fn write_groups(mut bits: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (bits as u8) & PAYLOAD;
        bits >>= 7;
        if bits != 0 {
            byte |= MORE;
        }
        out.push(byte);
        if bits == 0 {
            break;
        }
    }
}

/// Number of bytes `encode_int64` emits for `value`.
pub fn encoded_len(value: i64) -> usize {
    if value < 0 {
        return 10;
    }
    let mut bits = value as u64;
    let mut n = 1;
    while bits >= 0x80 {
        bits >>= 7;
        n += 1;
    }
    n
}

/// Read a varint and check that it fits the signed 32-bit range.
pub fn decode_int32(cursor: &mut ByteCursor<'_>) -> DecodeResult<i32> {
    let first = cursor.get8()?;
    if first & MORE == 0 {
        return Ok(i32::from(first));
    }

    let mut result: u128 = 0;
    let mut shift: u32 = 0;
    let mut byte = first;
    loop {
        result |= u128::from(byte & PAYLOAD) << shift;
        shift += 7;
        if byte & MORE == 0 {
            break;
        }
        if shift >= MAX_SHIFT {
            return Err(DecodeError::corrupted("unterminated varint"));
        }
        byte = cursor.get8()?;
    }

    let value = to_signed(result)?;
    i32::try_from(value)
        .map_err(|_| DecodeError::corrupted(format!("varint {} exceeds int32", value)))
}

/// Read a varint over the full signed 64-bit range.
pub fn decode_int64(cursor: &mut ByteCursor<'_>) -> DecodeResult<i64> {
    let mut result: u128 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift >= MAX_SHIFT {
            return Err(DecodeError::corrupted("unterminated varint"));
        }
        let byte = cursor.get8()?;
        result |= u128::from(byte & PAYLOAD) << shift;
        shift += 7;
        if byte & MORE == 0 {
            break;
        }
    }
    to_signed(result)
}

/// Undo the modulo 2^64 wraparound applied to negative values.
fn to_signed(result: u128) -> DecodeResult<i64> {
    let unsigned =
        u64::try_from(result).map_err(|_| DecodeError::corrupted("varint exceeds 64 bits"))?;
    Ok(unsigned as i64)
}
