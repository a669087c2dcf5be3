//! # Row Writer
//!
//! Path-addressed writes into one scope of a row, with nested scopes written
//! through callbacks:
//!
//! ```ignore
//! RowWriter::write_buffer(&mut row, |w| {
//!     w.write_int32("id", 7)?;
//!     w.write_utf8("name", "ada")?;
//!     let tags = TypeArgument::typed_array(TypeArgument::new(LayoutType::Utf8));
//!     w.write_scope("tags", &tags, |t| {
//!         t.write_utf8("", "x")?;
//!         t.write_utf8("", "y")
//!     })
//! })?;
//! ```
//!
//! ## Schematized vs Sparse
//!
//! In a UDT scope, a path naming a declared fixed or variable column is
//! written into that column; the value must have the column's type. Every
//! other path becomes a sparse field. Writing `Null` to a schematized
//! column clears it.
//!
//! ## Indexed Scopes
//!
//! Inside arrays, sets, maps and tuples the path is ignored. Each write
//! targets the element under the writer's cursor and then advances, so
//! consecutive writes append (or, in fixed-arity scopes, fill elements in
//! order).
//!
//! ## Closing Scopes
//!
//! When the callback returns, the child scope's element count is patched,
//! set and map scopes are sorted and checked for duplicates, and the parent
//! moves past the child. If the callback fails, the row is left partially
//! written and the error is returned.

use tracing::warn;

use crate::layouts::{LayoutType, TypeArgument};
use crate::row::buffer::RowBuffer;
use crate::row::cursor::RowCursor;
use crate::row::value::{DateTime, Decimal, Float128, Guid, MongoDbObjectId, RowValue, UnixDateTime};
use crate::row::{RowError, RowResult, UpdateOptions};
use crate::schema::StorageKind;

#[derive(Debug)]
pub struct RowWriter<'a> {
    row: &'a mut RowBuffer,
    cursor: RowCursor,
    options: UpdateOptions,
}

impl<'a> RowWriter<'a> {
    /// Writer over the root scope of an initialized row.
    pub fn new(row: &'a mut RowBuffer) -> RowResult<Self> {
        let cursor = RowCursor::create(row)?;
        Ok(Self {
            row,
            cursor,
            options: UpdateOptions::Upsert,
        })
    }

    /// Runs `f` with a writer over the root scope of `row`.
    pub fn write_buffer<F>(row: &mut RowBuffer, f: F) -> RowResult<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> RowResult<()>,
    {
        let mut writer = RowWriter::new(row)?;
        f(&mut writer)
    }

    pub fn scope_type(&self) -> LayoutType {
        self.cursor.scope_type
    }

    pub fn index(&self) -> usize {
        self.cursor.index
    }

    pub fn update_options(&self) -> UpdateOptions {
        self.options
    }

    /// Conflict policy for subsequent sparse writes in this scope. For sets
    /// and maps it also decides how duplicates are handled on close.
    pub fn set_update_options(&mut self, options: UpdateOptions) {
        self.options = options;
    }

    pub fn row(&self) -> &RowBuffer {
        self.row
    }

    /// Index of the declared top-level fixed or variable column at `path`.
    fn schematized_column(&self, path: &str) -> Option<usize> {
        if self.cursor.scope_type != LayoutType::Udt {
            return None;
        }
        self.cursor
            .layout
            .find(path)
            .filter(|c| c.parent().is_none() && c.storage() != StorageKind::Sparse)
            .map(|c| c.index())
    }

    pub fn write_value(&mut self, path: &str, value: RowValue<'_>) -> RowResult<()> {
        if let Some(index) = self.schematized_column(path) {
            return self.write_column(index, &value);
        }
        self.position(path)?;
        self.row.write_sparse(&mut self.cursor, &value, self.options)?;
        self.advance()
    }

    fn write_column(&mut self, index: usize, value: &RowValue<'_>) -> RowResult<()> {
        let layout = self.cursor.layout.clone();
        let column = layout.column(index).ok_or(RowError::Failure)?;
        let scope_offset = self.cursor.scope_offset;
        let delta = match (column.storage(), value) {
            (StorageKind::Fixed, RowValue::Null) => {
                self.row.delete_fixed(scope_offset, column)?;
                0
            }
            (StorageKind::Fixed, value) => {
                self.row.write_fixed(scope_offset, column, value)?;
                0
            }
            (_, RowValue::Null) => self.row.delete_variable(scope_offset, &layout, column)?,
            (_, value) => self.row.write_variable(scope_offset, &layout, column, value)?,
        };
        if delta != 0 {
            self.cursor.shift(delta);
        }
        Ok(())
    }

    /// Positions the cursor for a write to `path`. Keyed scopes look the path
    /// up; indexed scopes write at the current element.
    fn position(&mut self, path: &str) -> RowResult<()> {
        if self.cursor.scope_type.is_keyed_scope() {
            self.cursor.find(self.row, path)?;
        }
        Ok(())
    }

    fn advance(&mut self) -> RowResult<()> {
        if self.cursor.scope_type.is_indexed_scope() {
            self.cursor.move_next(self.row)?;
        }
        Ok(())
    }

    pub fn write_null(&mut self, path: &str) -> RowResult<()> {
        self.write_value(path, RowValue::Null)
    }

    crate::typed_writers! {
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
        utf8 => Utf8: &str,
        binary => Binary: &[u8],
    }

    /// Removes the value at `path` (keyed scopes) or at the current element
    /// (indexed scopes).
    pub fn delete(&mut self, path: &str) -> RowResult<()> {
        if let Some(index) = self.schematized_column(path) {
            return self.write_column(index, &RowValue::Null);
        }
        if self.cursor.scope_type.is_keyed_scope() && !self.cursor.find(self.row, path)? {
            return Err(RowError::NotFound);
        }
        self.row.delete_sparse(&mut self.cursor)
    }

    /// Writes a scope of type `type_arg` at `path` and fills it with `f`.
    pub fn write_scope<F>(&mut self, path: &str, type_arg: &TypeArgument, f: F) -> RowResult<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> RowResult<()>,
    {
        self.write_scope_inner(path, type_arg, true, f)
    }

    /// Writes a nullable scope. With `has_value` false the scope holds null
    /// and `f` must not write anything.
    pub fn write_nullable<F>(
        &mut self,
        path: &str,
        type_arg: &TypeArgument,
        has_value: bool,
        f: F,
    ) -> RowResult<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> RowResult<()>,
    {
        if type_arg.layout_type != LayoutType::Nullable {
            return Err(RowError::TypeConstraint);
        }
        self.write_scope_inner(path, type_arg, has_value, f)
    }

    /// Appends one key/value entry to a map scope. `f` writes the key, then
    /// the value.
    pub fn write_map_entry<F>(&mut self, f: F) -> RowResult<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> RowResult<()>,
    {
        let entry = match self.cursor.scope_type {
            LayoutType::TypedMap => self
                .cursor
                .scope_type_args
                .element_type(LayoutType::TypedMap, 0)
                .ok_or(RowError::InvalidRow)?,
            _ => return Err(RowError::TypeConstraint),
        };
        self.write_scope_inner("", &entry, true, f)
    }

    fn write_scope_inner<F>(
        &mut self,
        path: &str,
        type_arg: &TypeArgument,
        has_value: bool,
        f: F,
    ) -> RowResult<()>
    where
        F: FnOnce(&mut RowWriter<'_>) -> RowResult<()>,
    {
        if !type_arg.layout_type.is_scope() || !type_arg.is_well_formed() {
            return Err(RowError::TypeConstraint);
        }
        if self.schematized_column(path).is_some() {
            return Err(RowError::TypeConstraint);
        }
        self.position(path)?;
        let child_cursor =
            self.row
                .write_sparse_scope_with(&mut self.cursor, type_arg, has_value, self.options)?;

        let mut child = RowWriter {
            row: &mut *self.row,
            cursor: child_cursor,
            options: UpdateOptions::Upsert,
        };
        if child.cursor.scope_type.is_indexed_scope() {
            child.cursor.move_next(child.row)?;
        }
        if let Err(err) = f(&mut child) {
            warn!(scope = %type_arg, path, error = %err, "scope write abandoned");
            return Err(err);
        }

        let RowWriter {
            cursor: mut child_cursor,
            options: child_options,
            ..
        } = child;
        self.close_scope(&mut child_cursor, child_options)?;
        self.advance()
    }

    fn close_scope(&mut self, child: &mut RowCursor, options: UpdateOptions) -> RowResult<()> {
        if child.scope_type.is_sized_scope() {
            self.row.patch_scope_count(child)?;
        }
        if child.scope_type.is_unique_scope() {
            self.row.typed_collection_unique_index_rebuild(child, options)?;
        }
        self.cursor.skip(self.row, child)
    }
}
