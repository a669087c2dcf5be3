//! # Wire Type Codes
//!
//! One byte precedes every sparse field (outside typed scopes) and every
//! encoded type argument. Codes are grouped: primitives in `1..=24`, scopes in
//! `30..=68`, and the `EndScope` terminator at `70`.
//!
//! ```text
//! 0         Invalid (never written)
//! 1..=24    Null, BooleanFalse, Boolean, integers, floats, dates, ids, utf8, binary
//! 30..=52   Object, Array, TypedArray, Tuple, TypedTuple, TypedMap, TypedSet,
//!           Nullable, Tagged, Tagged2
//! 68        Schema (UDT)
//! 70        EndScope
//! ```
//!
//! Booleans carry their value in the code: `Boolean` is `true` and
//! `BooleanFalse` is `false`, so a sparse boolean field has no payload.

use crate::row::{RowError, RowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LayoutCode {
    Invalid = 0,
    Null = 1,
    BooleanFalse = 2,
    Boolean = 3,
    Int8 = 5,
    Int16 = 6,
    Int32 = 7,
    Int64 = 8,
    UInt8 = 9,
    UInt16 = 10,
    UInt32 = 11,
    UInt64 = 12,
    VarInt = 13,
    VarUInt = 14,
    Float32 = 15,
    Float64 = 16,
    Decimal = 17,
    DateTime = 18,
    Guid = 19,
    Utf8 = 20,
    Binary = 21,
    Float128 = 22,
    UnixDateTime = 23,
    MongoDbObjectId = 24,
    ObjectScope = 30,
    ArrayScope = 32,
    TypedArrayScope = 34,
    TupleScope = 36,
    TypedTupleScope = 38,
    TypedMapScope = 42,
    TypedSetScope = 46,
    NullableScope = 48,
    TaggedScope = 50,
    Tagged2Scope = 52,
    Schema = 68,
    EndScope = 70,
}

impl LayoutCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_scope(self) -> bool {
        matches!(
            self,
            LayoutCode::ObjectScope
                | LayoutCode::ArrayScope
                | LayoutCode::TypedArrayScope
                | LayoutCode::TupleScope
                | LayoutCode::TypedTupleScope
                | LayoutCode::TypedMapScope
                | LayoutCode::TypedSetScope
                | LayoutCode::NullableScope
                | LayoutCode::TaggedScope
                | LayoutCode::Tagged2Scope
                | LayoutCode::Schema
        )
    }
}

impl TryFrom<u8> for LayoutCode {
    type Error = RowError;

    fn try_from(value: u8) -> RowResult<Self> {
        match value {
            1 => Ok(LayoutCode::Null),
            2 => Ok(LayoutCode::BooleanFalse),
            3 => Ok(LayoutCode::Boolean),
            5 => Ok(LayoutCode::Int8),
            6 => Ok(LayoutCode::Int16),
            7 => Ok(LayoutCode::Int32),
            8 => Ok(LayoutCode::Int64),
            9 => Ok(LayoutCode::UInt8),
            10 => Ok(LayoutCode::UInt16),
            11 => Ok(LayoutCode::UInt32),
            12 => Ok(LayoutCode::UInt64),
            13 => Ok(LayoutCode::VarInt),
            14 => Ok(LayoutCode::VarUInt),
            15 => Ok(LayoutCode::Float32),
            16 => Ok(LayoutCode::Float64),
            17 => Ok(LayoutCode::Decimal),
            18 => Ok(LayoutCode::DateTime),
            19 => Ok(LayoutCode::Guid),
            20 => Ok(LayoutCode::Utf8),
            21 => Ok(LayoutCode::Binary),
            22 => Ok(LayoutCode::Float128),
            23 => Ok(LayoutCode::UnixDateTime),
            24 => Ok(LayoutCode::MongoDbObjectId),
            30 => Ok(LayoutCode::ObjectScope),
            32 => Ok(LayoutCode::ArrayScope),
            34 => Ok(LayoutCode::TypedArrayScope),
            36 => Ok(LayoutCode::TupleScope),
            38 => Ok(LayoutCode::TypedTupleScope),
            42 => Ok(LayoutCode::TypedMapScope),
            46 => Ok(LayoutCode::TypedSetScope),
            48 => Ok(LayoutCode::NullableScope),
            50 => Ok(LayoutCode::TaggedScope),
            52 => Ok(LayoutCode::Tagged2Scope),
            68 => Ok(LayoutCode::Schema),
            70 => Ok(LayoutCode::EndScope),
            _ => Err(RowError::InvalidRow),
        }
    }
}
