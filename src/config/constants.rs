//! # HybridRow Configuration Constants
//!
//! This module centralizes the numeric constants of the row format, grouping
//! interdependent values together. Constants that describe the wire format are
//! part of the compatibility contract: changing any of them changes the bytes
//! produced for the same logical row.
//!
//! ## Dependency Graph
//!
//! ```text
//! ROW_HEADER_SIZE (5 bytes)
//!       │
//!       ├─> HYBRID_ROW_VERSION_SIZE (1 byte)
//!       └─> SCHEMA_ID_SIZE (4 bytes, i32 LE)
//!
//! FixedSegment = bitmap + fixed columns + VARIABLE_SLOT_SIZE * variable columns
//!       │
//!       └─> VARIABLE_SLOT_SIZE (4 bytes, u32 LE end offset)
//!
//! Sized scopes (typed array, set, map)
//!       │
//!       └─> SCOPE_COUNT_SIZE (4 bytes, u32 LE element count)
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `ROW_HEADER_SIZE == HYBRID_ROW_VERSION_SIZE + SCHEMA_ID_SIZE`
//! 2. `DEFAULT_INITIAL_CAPACITY >= ROW_HEADER_SIZE`
//! 3. `MAX_VARINT_LEN` covers a full u64 in 7-bit groups

// ============================================================================
// ROW HEADER
// Leading bytes of every row
// ============================================================================

/// Version byte written at offset 0 of every row.
pub const HYBRID_ROW_VERSION_V1: u8 = 0x81;

pub const HYBRID_ROW_VERSION_SIZE: usize = 1;

pub const SCHEMA_ID_SIZE: usize = 4;

/// Total header size: version byte followed by the root schema id.
pub const ROW_HEADER_SIZE: usize = 5;

const _: () = assert!(
    ROW_HEADER_SIZE == HYBRID_ROW_VERSION_SIZE + SCHEMA_ID_SIZE,
    "ROW_HEADER_SIZE derivation mismatch"
);

// ============================================================================
// SEGMENT LAYOUT
// Widths of the structural fields inside a scope
// ============================================================================

/// Width of one variable-column end-offset slot in the fixed segment.
pub const VARIABLE_SLOT_SIZE: usize = 4;

/// Width of the element count that follows the type arguments of a sized scope.
pub const SCOPE_COUNT_SIZE: usize = 4;

/// Width of the has-value flag at the head of a nullable scope.
pub const NULLABLE_FLAG_SIZE: usize = 1;

/// Width of a type code.
pub const LAYOUT_CODE_SIZE: usize = 1;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

const _: () = assert!(MAX_VARINT_LEN * 7 >= 64, "MAX_VARINT_LEN must cover u64");

// ============================================================================
// BUFFER SIZING
// Growth policy for RowBuffer
// ============================================================================

/// Capacity reserved by a fresh RowBuffer before the first write.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Multiplier applied by the default resizer when a write overflows.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Largest row the format can address (offsets are u32 on the wire).
pub const MAX_ROW_SIZE: usize = u32::MAX as usize;

const _: () = assert!(
    DEFAULT_INITIAL_CAPACITY >= ROW_HEADER_SIZE,
    "DEFAULT_INITIAL_CAPACITY must hold at least the row header"
);

// ============================================================================
// STRUCTURAL LIMITS
// ============================================================================

/// Maximum scope nesting depth accepted when decoding or compiling.
/// Guards recursion on malformed or adversarial input.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum number of arguments of a tuple type.
pub const MAX_TUPLE_ARITY: usize = 255;
