//! # Compiled Layout
//!
//! A `Layout` is the physical description of one schema. It is immutable once
//! built and shared between rows through `Arc<Layout>`.
//!
//! ## Fixed Segment Shape
//!
//! ```text
//! +-------------+----------------------------+-------------------------------+
//! | null bitmap | fixed columns              | variable end-offset slots     |
//! | ceil(n/8) B | declaration order, packed  | u32 LE per variable column    |
//! +-------------+----------------------------+-------------------------------+
//! ^ 0           ^ num_bitmask_bytes          ^ slots_offset                  ^ size
//! ```
//!
//! Bits are allocated in declaration order: one per nullable fixed column and
//! one per variable column. A set bit means the value is present.
//!
//! ## Column Order
//!
//! `columns` holds the fixed columns first, then the variable columns, then
//! every sparse column (including children of object properties) in
//! depth-first declaration order. `LayoutColumn::index` is the position in
//! that vector.

use hashbrown::HashMap;

use crate::config::VARIABLE_SLOT_SIZE;
use crate::layouts::layout_type::{LayoutType, TypeArgument, TypeArgumentList};
use crate::layouts::tokenizer::StringTokenizer;
use crate::schema::{SchemaId, StorageKind};

/// Position of a presence bit in a layout's null bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBit(usize);

impl LayoutBit {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn byte_offset(self) -> usize {
        self.0 / 8
    }

    pub fn mask(self) -> u8 {
        1 << (self.0 % 8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutColumn {
    pub(crate) path: String,
    pub(crate) full_path: String,
    pub(crate) type_arg: TypeArgument,
    pub(crate) storage: StorageKind,
    pub(crate) nullable: bool,
    pub(crate) null_bit: Option<LayoutBit>,
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) index: usize,
    pub(crate) parent: Option<usize>,
}

impl LayoutColumn {
    /// Path segment relative to the enclosing scope.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dotted path from the root of the layout.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn layout_type(&self) -> LayoutType {
        self.type_arg.layout_type
    }

    pub fn type_args(&self) -> &TypeArgumentList {
        &self.type_arg.type_args
    }

    pub fn type_argument(&self) -> &TypeArgument {
        &self.type_arg
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn null_bit(&self) -> Option<LayoutBit> {
        self.null_bit
    }

    /// Byte offset within the fixed segment for fixed columns.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Ordinal among the variable columns. Only meaningful for variable storage.
    pub fn variable_index(&self) -> usize {
        self.offset
    }

    /// Encoded width of a fixed column, zero otherwise.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub(crate) schema_id: SchemaId,
    pub(crate) name: String,
    pub(crate) columns: Vec<LayoutColumn>,
    pub(crate) num_fixed: usize,
    pub(crate) num_variable: usize,
    pub(crate) num_bitmask_bytes: usize,
    pub(crate) slots_offset: usize,
    pub(crate) size: usize,
    pub(crate) path_index: HashMap<String, usize>,
    pub(crate) tokenizer: StringTokenizer,
    pub(crate) allow_unschematized: bool,
}

impl Layout {
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[LayoutColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&LayoutColumn> {
        self.columns.get(index)
    }

    pub fn fixed_columns(&self) -> &[LayoutColumn] {
        &self.columns[..self.num_fixed]
    }

    pub fn variable_columns(&self) -> &[LayoutColumn] {
        &self.columns[self.num_fixed..self.num_fixed + self.num_variable]
    }

    /// Fixed then variable columns: the ones with a schema-assigned location.
    pub fn schematized_columns(&self) -> &[LayoutColumn] {
        &self.columns[..self.num_fixed + self.num_variable]
    }

    pub fn sparse_columns(&self) -> &[LayoutColumn] {
        &self.columns[self.num_fixed + self.num_variable..]
    }

    pub fn num_variable(&self) -> usize {
        self.num_variable
    }

    pub fn find(&self, full_path: &str) -> Option<&LayoutColumn> {
        self.path_index.get(full_path).map(|&i| &self.columns[i])
    }

    pub fn num_bitmask_bytes(&self) -> usize {
        self.num_bitmask_bytes
    }

    /// Offset of variable slot `index` within the fixed segment.
    pub fn variable_slot_offset(&self, index: usize) -> usize {
        self.slots_offset + index * VARIABLE_SLOT_SIZE
    }

    /// Total width of the fixed segment (bitmap, fixed columns, slots).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn tokenizer(&self) -> &StringTokenizer {
        &self.tokenizer
    }

    pub fn allow_unschematized(&self) -> bool {
        self.allow_unschematized
    }
}
