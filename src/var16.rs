//! Variable width (1 or 2 byte) unsigned integers used for repeat counts.
//!
//! Values below `0xC0` take a single byte biased by `0x40`. Anything larger
//! is stored big-endian in two bytes whose first byte stays below `0x40`, so
//! the decoder can tell the forms apart by the first byte alone.

use crate::error::Var16Overflow;
use bytes::{Buf, BufMut};

/// Largest value the two byte form can carry.
pub const MAX: u16 = 0x3FFF;

const SHORT_LIMIT: u16 = 0xC0;
const SHORT_BIAS: u8 = 0x40;

/// Number of bytes `value` takes once encoded.
pub fn encoded_len(value: u16) -> usize {
    if value < SHORT_LIMIT {
        1
    } else {
        2
    }
}

pub fn encode<B: BufMut>(
    value: u16,
    out: &mut B,
) -> Result<usize, Var16Overflow> {
    if value > MAX {
        return Err(Var16Overflow(value));
    }

    if value < SHORT_LIMIT {
        out.put_u8(value as u8 + SHORT_BIAS);
        Ok(1)
    } else {
        out.put_u8(((value >> 8) & 0x3F) as u8);
        out.put_u8((value & 0xFF) as u8);
        Ok(2)
    }
}

/// Returns `None` if the buffer runs out before the value is complete.
pub fn decode<B: Buf>(buf: &mut B) -> Option<u16> {
    if !buf.has_remaining() {
        return None;
    }

    let first = buf.get_u8();
    if first >= SHORT_BIAS {
        return Some(u16::from(first - SHORT_BIAS));
    }

    if !buf.has_remaining() {
        return None;
    }
    let second = buf.get_u8();
    Some((u16::from(first) << 8) | u16::from(second))
}
