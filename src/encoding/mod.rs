//! # Encoding Module
//!
//! Low-level codecs shared by the layout compiler and the row engine:
//!
//! - **Varint encoding**: 7-bit-group variable-length integers with a zig-zag
//!   transform for signed values

pub mod varint;

pub use varint::{
    decode_varint, decode_varuint, encode_varint, encode_varuint, encode_varuint_array, varint_len,
    varuint_len, zigzag_decode, zigzag_encode, VarintError,
};
