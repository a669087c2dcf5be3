//! # Row Reader
//!
//! Forward-only enumeration of one scope. A reader over a UDT scope yields
//! the present schematized columns first, then the sparse fields; readers
//! over other scopes only yield sparse fields.
//!
//! ```ignore
//! let mut reader = RowReader::new(&row)?;
//! while reader.read()? {
//!     match reader.layout_type() {
//!         Some(LayoutType::Int32) => println!("{:?} = {}", reader.path()?, reader.read_int32()?),
//!         Some(ty) if ty.is_scope() => reader.read_scope_with(|child| visit(child))?,
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Nested Scopes
//!
//! `read_scope` returns an independent child reader. Once done with it, call
//! `skip_scope(&mut child)` so the parent can continue past the scope
//! without re-parsing it. `read_scope_with` does both.
//!
//! ## Nullable Fields
//!
//! A `Nullable<T>` field with its flag set reads as the inner `T` value,
//! through `read_value` and the matching `read_<t>` accessor alike. With the
//! flag clear it reads as `RowValue::Null`, so the typed accessor fails
//! with `TypeMismatch`; check `is_null` first.
//!
//! ## Checkpoints
//!
//! `save_checkpoint` captures the full position; `from_checkpoint` resumes
//! from it, provided the row has not been modified in between.

use crate::layouts::{LayoutColumn, LayoutType, TypeArgumentList};
use crate::row::buffer::RowBuffer;
use crate::row::cursor::RowCursor;
use crate::row::value::{DateTime, Decimal, Float128, Guid, MongoDbObjectId, RowValue, UnixDateTime};
use crate::row::{RowError, RowResult};
use crate::schema::StorageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Not yet positioned.
    None,
    Schematized,
    Sparse,
    Done,
}

/// Saved reader position.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    state: ReaderState,
    column_index: Option<usize>,
    cursor: RowCursor,
}

impl Checkpoint {
    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn column_index(&self) -> Option<usize> {
        self.column_index
    }
}

#[derive(Debug)]
pub struct RowReader<'a> {
    row: &'a RowBuffer,
    cursor: RowCursor,
    state: ReaderState,
}

impl<'a> RowReader<'a> {
    /// Reader over the root scope.
    pub fn new(row: &'a RowBuffer) -> RowResult<Self> {
        Ok(Self {
            row,
            cursor: RowCursor::create(row)?,
            state: ReaderState::None,
        })
    }

    pub fn from_checkpoint(row: &'a RowBuffer, checkpoint: Checkpoint) -> Self {
        Self {
            row,
            cursor: checkpoint.cursor,
            state: checkpoint.state,
        }
    }

    pub fn save_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state,
            column_index: self.cursor.column,
            cursor: self.cursor.clone(),
        }
    }

    /// Advances to the next field. Returns `false` once the scope is exhausted.
    pub fn read(&mut self) -> RowResult<bool> {
        loop {
            match self.state {
                ReaderState::None => {
                    self.state = match self.cursor.scope_type {
                        LayoutType::Udt => ReaderState::Schematized,
                        _ => ReaderState::Sparse,
                    };
                }
                ReaderState::Schematized => {
                    if self.cursor.move_next_column(self.row)? {
                        return Ok(true);
                    }
                    self.state = ReaderState::Sparse;
                }
                ReaderState::Sparse => {
                    if self.cursor.move_next_sparse(self.row)? {
                        return Ok(true);
                    }
                    self.state = ReaderState::Done;
                }
                ReaderState::Done => return Ok(false),
            }
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    fn positioned(&self) -> bool {
        match self.state {
            ReaderState::Schematized => self.cursor.column.is_some(),
            ReaderState::Sparse => self.cursor.exists,
            _ => false,
        }
    }

    /// Path of the current field, `None` for elements of indexed scopes.
    pub fn path(&self) -> RowResult<Option<&str>> {
        if !self.positioned() {
            return Err(RowError::Failure);
        }
        self.cursor.path(self.row)
    }

    pub fn storage(&self) -> StorageKind {
        self.cursor.storage()
    }

    pub fn column(&self) -> Option<&LayoutColumn> {
        self.cursor.column()
    }

    pub fn layout_type(&self) -> Option<LayoutType> {
        self.positioned().then_some(self.cursor.cell.layout_type)
    }

    pub fn type_args(&self) -> &TypeArgumentList {
        &self.cursor.cell.type_args
    }

    /// Position of the current element within its scope.
    pub fn index(&self) -> usize {
        self.cursor.index
    }

    pub fn scope_type(&self) -> LayoutType {
        self.cursor.scope_type
    }

    pub fn read_value(&self) -> RowResult<RowValue<'a>> {
        let row = self.row;
        match self.state {
            ReaderState::Schematized => {
                let column = self.cursor.column().ok_or(RowError::Failure)?;
                match column.storage() {
                    StorageKind::Fixed => row.read_fixed(self.cursor.scope_offset, column),
                    StorageKind::Variable => {
                        row.read_variable(self.cursor.scope_offset, &self.cursor.layout, column)
                    }
                    StorageKind::Sparse => Err(RowError::Failure),
                }
            }
            ReaderState::Sparse => row.read_sparse(&self.cursor),
            _ => Err(RowError::Failure),
        }
    }

    pub fn is_null(&self) -> RowResult<bool> {
        Ok(matches!(self.read_value()?, RowValue::Null))
    }

    crate::typed_readers! {
        bool => Bool: bool,
        int8 => Int8: i8,
        int16 => Int16: i16,
        int32 => Int32: i32,
        int64 => Int64: i64,
        uint8 => UInt8: u8,
        uint16 => UInt16: u16,
        uint32 => UInt32: u32,
        uint64 => UInt64: u64,
        varint => VarInt: i64,
        varuint => VarUInt: u64,
        float32 => Float32: f32,
        float64 => Float64: f64,
        float128 => Float128: Float128,
        decimal => Decimal: Decimal,
        datetime => DateTime: DateTime,
        unix_datetime => UnixDateTime: UnixDateTime,
        guid => Guid: Guid,
        mongodb_object_id => MongoDbObjectId: MongoDbObjectId,
        utf8 => Utf8: &'a str,
        binary => Binary: &'a [u8],
    }

    /// Reader over the scope held by the current field.
    pub fn read_scope(&self) -> RowResult<RowReader<'a>> {
        if self.state != ReaderState::Sparse {
            return Err(RowError::TypeMismatch);
        }
        Ok(RowReader {
            row: self.row,
            cursor: self.row.scope_cursor(&self.cursor)?,
            state: ReaderState::None,
        })
    }

    /// Runs `f` over the current field's scope, then skips past it.
    pub fn read_scope_with<F>(&mut self, f: F) -> RowResult<()>
    where
        F: FnOnce(&mut RowReader<'a>) -> RowResult<()>,
    {
        let mut child = self.read_scope()?;
        f(&mut child)?;
        self.skip_scope(&mut child)
    }

    /// Moves past the scope `child` was created over. `child` is exhausted
    /// afterwards.
    pub fn skip_scope(&mut self, child: &mut RowReader<'a>) -> RowResult<()> {
        if self.state != ReaderState::Sparse {
            return Err(RowError::Failure);
        }
        self.cursor.skip(self.row, &mut child.cursor)?;
        child.state = ReaderState::Done;
        Ok(())
    }
}
