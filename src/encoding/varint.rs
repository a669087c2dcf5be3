//! # Variable-Length Integer Encoding
//!
//! This module provides the 7-bit-group variable-length integer codec used
//! throughout the HybridRow format: sparse path tokens, inline path lengths,
//! Utf8/Binary length prefixes, tuple arities, and the payloads of `VarInt`
//! and `VarUInt` fields.
//!
//! ## Encoding Format
//!
//! Each byte carries 7 data bits. The high bit is a continuation flag: `1`
//! means another byte follows, `0` terminates the value. Groups are emitted
//! least-significant first.
//!
//! | Value Range                  | Bytes |
//! |------------------------------|-------|
//! | 0 - 127                      | 1     |
//! | 128 - 16383                  | 2     |
//! | 16384 - 2097151              | 3     |
//! | 2^21 - 2^28-1                | 4     |
//! | ...                          | ...   |
//! | 2^63 - u64::MAX              | 10    |
//!
//! ```text
//! Value 300 = 0b1_0010_1100
//!   Byte 0: 1_0101100 = 0xAC  (low 7 bits, continuation set)
//!   Byte 1: 0_0000010 = 0x02  (next 7 bits, last byte)
//! ```
//!
//! ## Signed Values
//!
//! Signed integers are passed through a zig-zag transform before encoding so
//! that small magnitudes of either sign stay short:
//!
//! | Signed | Zig-zag |
//! |--------|---------|
//! | 0      | 0       |
//! | -1     | 1       |
//! | 1      | 2       |
//! | -2     | 3       |
//! | i64::MAX | u64::MAX - 1 |
//! | i64::MIN | u64::MAX |
//!
//! ## Usage Example
//!
//! ```rust
//! use hybridrow::encoding::varint::{decode_varuint, encode_varuint, varuint_len};
//!
//! let mut buf = [0u8; 10];
//! let written = encode_varuint(300, &mut buf);
//! assert_eq!(written, 2);
//! assert_eq!(varuint_len(300), 2);
//! assert_eq!(&buf[..2], &[0xAC, 0x02]);
//!
//! let (value, read) = decode_varuint(&buf[..2]).unwrap();
//! assert_eq!(value, 300);
//! assert_eq!(read, 2);
//! ```
//!
//! ## Error Handling
//!
//! Decoding never panics. A buffer that ends before a terminating byte yields
//! `VarintError::UnexpectedEof`; more than 64 bits of payload yields
//! `VarintError::Overflow`. Row-level callers map both onto `InvalidRow`.
//!
//! All functions are pure and allocation-free.

use crate::config::MAX_VARINT_LEN;

const CONTINUATION_BIT: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    UnexpectedEof,
    Overflow,
}

impl std::fmt::Display for VarintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of buffer while reading varint"),
            Self::Overflow => write!(f, "varint overflow (too many bytes for u64)"),
        }
    }
}

impl std::error::Error for VarintError {}

#[inline]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
pub const fn varuint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

#[inline]
pub const fn varint_len(value: i64) -> usize {
    varuint_len(zigzag_encode(value))
}

/// Writes `value` into `buf` and returns the number of bytes written.
///
/// Panics if `buf` is shorter than `varuint_len(value)`.
#[inline]
pub fn encode_varuint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | CONTINUATION_BIT;
        i += 1;
    }
}

#[inline]
pub fn encode_varint(value: i64, buf: &mut [u8]) -> usize {
    encode_varuint(zigzag_encode(value), buf)
}

/// Encodes into a stack array, returning the array and the used length.
#[inline]
pub fn encode_varuint_array(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varuint(value, &mut buf);
    (buf, len)
}

pub fn decode_varuint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        let data = u64::from(byte & DATA_MASK);
        // the tenth byte may only contribute the single remaining bit
        if i == MAX_VARINT_LEN - 1 && data > 1 {
            return Err(VarintError::Overflow);
        }
        result |= data << shift;
        if byte & CONTINUATION_BIT == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    Err(VarintError::UnexpectedEof)
}

pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize), VarintError> {
    let (raw, len) = decode_varuint(buf)?;
    Ok((zigzag_decode(raw), len))
}
