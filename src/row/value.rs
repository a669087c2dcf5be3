//! # Row Values
//!
//! `RowValue` is the dynamically-typed form of a single primitive. Strings and
//! byte arrays borrow from the row buffer when read.
//!
//! ## Payload Encoding
//!
//! | Type | Bytes |
//! |------|-------|
//! | null | none |
//! | bool | 1 (`0`/`1`) in typed scopes and fixed columns; carried by the type code elsewhere |
//! | int/uint N | N/8, little-endian |
//! | float32/64 | IEEE-754 bits, little-endian |
//! | float128 | low `u64` LE, then high `i64` LE |
//! | decimal | 12-byte magnitude LE, 2 reserved, scale, sign (`0x80` = negative) |
//! | datetime | `i64` LE ticks |
//! | unixdatetime | `i64` LE milliseconds since the Unix epoch |
//! | guid | 16 raw bytes |
//! | mongodbobjectid | 12 raw bytes |
//! | utf8, binary | varuint byte length, then bytes |
//! | varint, varuint | the varint itself |

use crate::encoding::{
    decode_varint, decode_varuint, encode_varuint_array, varint_len, varuint_len, zigzag_encode,
};
use crate::layouts::{LayoutType, MetaBytes};
use crate::row::{RowError, RowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Float128 {
    pub high: i64,
    pub low: u64,
}

impl Float128 {
    pub fn new(high: i64, low: u64) -> Self {
        Self { high, low }
    }

    fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.low.to_le_bytes());
        out[8..].copy_from_slice(&self.high.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        high.copy_from_slice(&bytes[8..]);
        Self {
            low: u64::from_le_bytes(low),
            high: i64::from_le_bytes(high),
        }
    }
}

/// 96-bit signed decimal with a base-10 scale of at most 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    pub const MAX_SCALE: u8 = 28;
    pub const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        if scale > Self::MAX_SCALE || mantissa.unsigned_abs() > Self::MAX_MANTISSA {
            return None;
        }
        Some(Self { mantissa, scale })
    }

    pub fn mantissa(self) -> i128 {
        self.mantissa
    }

    pub fn scale(self) -> u8 {
        self.scale
    }

    fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..12].copy_from_slice(&self.mantissa.unsigned_abs().to_le_bytes()[..12]);
        out[14] = self.scale;
        if self.mantissa < 0 {
            out[15] = 0x80;
        }
        out
    }

    fn from_bytes(bytes: &[u8; 16]) -> RowResult<Self> {
        let mut magnitude = [0u8; 16];
        magnitude[..12].copy_from_slice(&bytes[..12]);
        let magnitude = u128::from_le_bytes(magnitude) as i128;
        let scale = bytes[14];
        if scale > Self::MAX_SCALE || bytes[12] != 0 || bytes[13] != 0 || bytes[15] & 0x7F != 0 {
            return Err(RowError::InvalidRow);
        }
        let mantissa = if bytes[15] & 0x80 != 0 {
            -magnitude
        } else {
            magnitude
        };
        Ok(Self { mantissa, scale })
    }
}

/// 100-nanosecond ticks since 0001-01-01T00:00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DateTime(pub i64);

/// Milliseconds since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UnixDateTime(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub [u8; 16]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MongoDbObjectId(pub [u8; 12]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowValue<'a> {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    VarInt(i64),
    VarUInt(u64),
    Float32(f32),
    Float64(f64),
    Float128(Float128),
    Decimal(Decimal),
    DateTime(DateTime),
    UnixDateTime(UnixDateTime),
    Guid(Guid),
    MongoDbObjectId(MongoDbObjectId),
    Utf8(&'a str),
    Binary(&'a [u8]),
}

fn array<const N: usize>(bytes: &[u8]) -> RowResult<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or(RowError::InvalidRow)
}

impl<'a> RowValue<'a> {
    pub fn layout_type(&self) -> LayoutType {
        match self {
            RowValue::Null => LayoutType::Null,
            RowValue::Bool(_) => LayoutType::Boolean,
            RowValue::Int8(_) => LayoutType::Int8,
            RowValue::Int16(_) => LayoutType::Int16,
            RowValue::Int32(_) => LayoutType::Int32,
            RowValue::Int64(_) => LayoutType::Int64,
            RowValue::UInt8(_) => LayoutType::UInt8,
            RowValue::UInt16(_) => LayoutType::UInt16,
            RowValue::UInt32(_) => LayoutType::UInt32,
            RowValue::UInt64(_) => LayoutType::UInt64,
            RowValue::VarInt(_) => LayoutType::VarInt,
            RowValue::VarUInt(_) => LayoutType::VarUInt,
            RowValue::Float32(_) => LayoutType::Float32,
            RowValue::Float64(_) => LayoutType::Float64,
            RowValue::Float128(_) => LayoutType::Float128,
            RowValue::Decimal(_) => LayoutType::Decimal,
            RowValue::DateTime(_) => LayoutType::DateTime,
            RowValue::UnixDateTime(_) => LayoutType::UnixDateTime,
            RowValue::Guid(_) => LayoutType::Guid,
            RowValue::MongoDbObjectId(_) => LayoutType::MongoDbObjectId,
            RowValue::Utf8(_) => LayoutType::Utf8,
            RowValue::Binary(_) => LayoutType::Binary,
        }
    }

    /// Raw bytes of a utf8 or binary value.
    pub fn as_raw_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            RowValue::Utf8(s) => Some(s.as_bytes()),
            RowValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn payload_len(&self) -> usize {
        match self {
            RowValue::VarInt(v) => varint_len(*v),
            RowValue::VarUInt(v) => varuint_len(*v),
            RowValue::Utf8(s) => varuint_len(s.len() as u64) + s.len(),
            RowValue::Binary(b) => varuint_len(b.len() as u64) + b.len(),
            other => other.layout_type().fixed_size().unwrap_or(0),
        }
    }

    /// Appends the payload encoding (see module docs).
    pub fn write_payload(&self, out: &mut MetaBytes) {
        match *self {
            RowValue::Null => {}
            RowValue::Bool(v) => out.push(v as u8),
            RowValue::Int8(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::UInt8(v) => out.push(v),
            RowValue::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::VarInt(v) => {
                let (buf, n) = encode_varuint_array(zigzag_encode(v));
                out.extend_from_slice(&buf[..n]);
            }
            RowValue::VarUInt(v) => {
                let (buf, n) = encode_varuint_array(v);
                out.extend_from_slice(&buf[..n]);
            }
            RowValue::Float32(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            RowValue::Float64(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            RowValue::Float128(v) => out.extend_from_slice(&v.to_bytes()),
            RowValue::Decimal(v) => out.extend_from_slice(&v.to_bytes()),
            RowValue::DateTime(v) => out.extend_from_slice(&v.0.to_le_bytes()),
            RowValue::UnixDateTime(v) => out.extend_from_slice(&v.0.to_le_bytes()),
            RowValue::Guid(v) => out.extend_from_slice(&v.0),
            RowValue::MongoDbObjectId(v) => out.extend_from_slice(&v.0),
            RowValue::Utf8(_) | RowValue::Binary(_) => {
                let raw = self.as_raw_bytes().unwrap_or_default();
                let (buf, n) = encode_varuint_array(raw.len() as u64);
                out.extend_from_slice(&buf[..n]);
                out.extend_from_slice(raw);
            }
        }
    }

    /// Decodes a payload of type `ty` from the front of `bytes`, returning the
    /// value and the number of bytes consumed.
    pub fn read_payload(ty: LayoutType, bytes: &'a [u8]) -> RowResult<(RowValue<'a>, usize)> {
        if let Some(size) = ty.fixed_size() {
            let raw = bytes.get(..size).ok_or(RowError::InvalidRow)?;
            return Ok((Self::decode_fixed(ty, raw)?, size));
        }
        match ty {
            LayoutType::VarInt => {
                let (v, n) = decode_varint(bytes)?;
                Ok((RowValue::VarInt(v), n))
            }
            LayoutType::VarUInt => {
                let (v, n) = decode_varuint(bytes)?;
                Ok((RowValue::VarUInt(v), n))
            }
            LayoutType::Utf8 | LayoutType::Binary => {
                let (len, n) = decode_varuint(bytes)?;
                let len = usize::try_from(len).map_err(|_| RowError::InvalidRow)?;
                let end = n.checked_add(len).ok_or(RowError::InvalidRow)?;
                let raw = bytes.get(n..end).ok_or(RowError::InvalidRow)?;
                Ok((Self::from_raw(ty, raw)?, end))
            }
            _ => Err(RowError::TypeMismatch),
        }
    }

    /// Builds a utf8/binary value from unprefixed bytes.
    pub fn from_raw(ty: LayoutType, raw: &'a [u8]) -> RowResult<RowValue<'a>> {
        match ty {
            LayoutType::Utf8 => std::str::from_utf8(raw)
                .map(RowValue::Utf8)
                .map_err(|_| RowError::InvalidRow),
            LayoutType::Binary => Ok(RowValue::Binary(raw)),
            _ => Err(RowError::TypeMismatch),
        }
    }

    fn decode_fixed(ty: LayoutType, raw: &'a [u8]) -> RowResult<RowValue<'a>> {
        let value = match ty {
            LayoutType::Null => RowValue::Null,
            LayoutType::Boolean => match raw[0] {
                0 => RowValue::Bool(false),
                1 => RowValue::Bool(true),
                _ => return Err(RowError::InvalidRow),
            },
            LayoutType::Int8 => RowValue::Int8(raw[0] as i8),
            LayoutType::Int16 => RowValue::Int16(i16::from_le_bytes(array(raw)?)),
            LayoutType::Int32 => RowValue::Int32(i32::from_le_bytes(array(raw)?)),
            LayoutType::Int64 => RowValue::Int64(i64::from_le_bytes(array(raw)?)),
            LayoutType::UInt8 => RowValue::UInt8(raw[0]),
            LayoutType::UInt16 => RowValue::UInt16(u16::from_le_bytes(array(raw)?)),
            LayoutType::UInt32 => RowValue::UInt32(u32::from_le_bytes(array(raw)?)),
            LayoutType::UInt64 => RowValue::UInt64(u64::from_le_bytes(array(raw)?)),
            LayoutType::Float32 => RowValue::Float32(f32::from_bits(u32::from_le_bytes(array(raw)?))),
            LayoutType::Float64 => RowValue::Float64(f64::from_bits(u64::from_le_bytes(array(raw)?))),
            LayoutType::Float128 => RowValue::Float128(Float128::from_bytes(&array(raw)?)),
            LayoutType::Decimal => RowValue::Decimal(Decimal::from_bytes(&array(raw)?)?),
            LayoutType::DateTime => RowValue::DateTime(DateTime(i64::from_le_bytes(array(raw)?))),
            LayoutType::UnixDateTime => {
                RowValue::UnixDateTime(UnixDateTime(i64::from_le_bytes(array(raw)?)))
            }
            LayoutType::Guid => RowValue::Guid(Guid(array(raw)?)),
            LayoutType::MongoDbObjectId => RowValue::MongoDbObjectId(MongoDbObjectId(array(raw)?)),
            _ => return Err(RowError::TypeMismatch),
        };
        Ok(value)
    }
}
