//! # Row Header
//!
//! Every row starts with a 5-byte header: the format version byte followed by
//! the root schema id.
//!
//! ```text
//! +---------+------------------+
//! | version | schema_id        |
//! | u8 0x81 | i32 little-endian|
//! +---------+------------------+
//! ```

use zerocopy::little_endian::I32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{HYBRID_ROW_VERSION_V1, ROW_HEADER_SIZE};
use crate::row::{RowError, RowResult};
use crate::schema::SchemaId;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RowHeader {
    version: u8,
    schema_id: I32,
}

const _: () = assert!(std::mem::size_of::<RowHeader>() == ROW_HEADER_SIZE);

impl RowHeader {
    pub fn new(version: u8, schema_id: SchemaId) -> Self {
        Self {
            version,
            schema_id: I32::new(schema_id.id()),
        }
    }

    /// Parses and validates the header at the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> RowResult<&Self> {
        let raw = bytes.get(..ROW_HEADER_SIZE).ok_or(RowError::InvalidRow)?;
        let header = Self::ref_from_bytes(raw).map_err(|_| RowError::InvalidRow)?;
        if header.version != HYBRID_ROW_VERSION_V1 || !header.schema().is_valid() {
            return Err(RowError::InvalidRow);
        }
        Ok(header)
    }

    crate::zerocopy_accessors! {
        version: u8,
        schema_id: i32,
    }

    pub fn schema(&self) -> SchemaId {
        SchemaId(self.schema_id())
    }
}
