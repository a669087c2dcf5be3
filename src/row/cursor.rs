//! # Row Cursor
//!
//! A `RowCursor` is a position inside one scope of a row: which scope it is
//! (type, type arguments, offsets) and which field within it is current.
//! Cursors are plain values. They never borrow the buffer, so every method
//! takes the `RowBuffer` it operates on.
//!
//! ## Field Enumeration
//!
//! UDT scopes enumerate their present schematized columns first (fixed, then
//! variable, in layout order), then their sparse fields. Every other scope
//! only has sparse fields.
//!
//! ```text
//! scope kind        end of enumeration
//! ----------------  -------------------------------------
//! object, udt       [0][EndScope] terminator
//! array             [EndScope] terminator
//! typed-array/set   index == element count (u32 prefix)
//! map               index == element count (u32 prefix)
//! tuple family      index == arity
//! nullable          index == has_value flag
//! ```
//!
//! Once exhausted, `meta_offset` is the insertion point for a new element.
//!
//! ## Offsets
//!
//! ```text
//! meta_offset   value_offset        end
//!      |             |               |
//!      [path][code][args][ payload   ]
//! ```
//!
//! `end` is computed lazily and cached. Writes through a cursor keep its
//! offsets current; other cursors on the same row must be re-created or
//! shifted after a write that changes the row length.

use std::sync::Arc;

use crate::config::ROW_HEADER_SIZE;
use crate::layouts::{Layout, LayoutColumn, LayoutType, TypeArgument, TypeArgumentList};
use crate::row::buffer::RowBuffer;
use crate::row::sparse::KEYED_SCOPE_END;
use crate::row::{RowError, RowResult};
use crate::schema::StorageKind;

/// Path written for a sparse field: a layout token when the path is
/// declared, otherwise the literal string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SparsePath {
    Token(u64),
    Text(Box<str>),
}

/// Path of the current field as stored in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FieldPath {
    #[default]
    None,
    Token(u64),
    Text { offset: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct RowCursor {
    /// Nearest enclosing UDT layout; supplies the path tokenizer.
    pub(crate) layout: Arc<Layout>,
    pub(crate) scope_type: LayoutType,
    pub(crate) scope_type_args: TypeArgumentList,
    /// Start of the scope's value: fixed segment of a UDT, count prefix of a
    /// sized scope, flag byte of a nullable.
    pub(crate) scope_offset: usize,
    /// First child field.
    pub(crate) start: usize,
    /// Element count of sized scopes, arity of tuples, flag of nullables.
    pub(crate) count: usize,
    pub(crate) depth: usize,

    pub(crate) started: bool,
    pub(crate) exists: bool,
    pub(crate) index: usize,
    pub(crate) meta_offset: usize,
    pub(crate) value_offset: usize,
    pub(crate) end_offset: Option<usize>,
    pub(crate) path: FieldPath,
    pub(crate) cell: TypeArgument,
    /// Value of a boolean carried in its type code.
    pub(crate) coded_bool: Option<bool>,
    pub(crate) write_path: Option<SparsePath>,

    pub(crate) column: Option<usize>,
    pub(crate) next_column: usize,
    pub(crate) in_sparse: bool,
}

impl RowCursor {
    /// Cursor over the root scope of an initialized row.
    pub fn create(row: &RowBuffer) -> RowResult<RowCursor> {
        let layout = Arc::clone(row.layout()?);
        let start = row.sparse_start(ROW_HEADER_SIZE, &layout)?;
        let args = TypeArgumentList::Schema(layout.schema_id());
        Ok(Self::new_scope(layout, LayoutType::Udt, args, ROW_HEADER_SIZE, start, 0, 0))
    }

    pub(crate) fn new_scope(
        layout: Arc<Layout>,
        scope_type: LayoutType,
        scope_type_args: TypeArgumentList,
        scope_offset: usize,
        start: usize,
        count: usize,
        depth: usize,
    ) -> RowCursor {
        RowCursor {
            layout,
            scope_type,
            scope_type_args,
            scope_offset,
            start,
            count,
            depth,
            started: false,
            exists: false,
            index: 0,
            meta_offset: start,
            value_offset: start,
            end_offset: None,
            path: FieldPath::None,
            cell: TypeArgument::new(LayoutType::Null),
            coded_bool: None,
            write_path: None,
            column: None,
            next_column: 0,
            in_sparse: scope_type != LayoutType::Udt,
        }
    }

    pub fn scope_type(&self) -> LayoutType {
        self.scope_type
    }

    pub fn scope_type_args(&self) -> &TypeArgumentList {
        &self.scope_type_args
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Type of the current field.
    pub fn cell(&self) -> &TypeArgument {
        &self.cell
    }

    /// Current schematized column, if the cursor is on one.
    pub fn column(&self) -> Option<&LayoutColumn> {
        self.column.and_then(|i| self.layout.column(i))
    }

    pub fn storage(&self) -> StorageKind {
        self.column().map_or(StorageKind::Sparse, LayoutColumn::storage)
    }

    /// Advances to the next field. Returns `false` once the scope is exhausted.
    pub fn move_next(&mut self, row: &RowBuffer) -> RowResult<bool> {
        if !self.in_sparse {
            if self.move_next_column(row)? {
                return Ok(true);
            }
            self.in_sparse = true;
        }
        self.move_next_sparse(row)
    }

    /// Advances to the next present schematized column of a UDT scope.
    pub(crate) fn move_next_column(&mut self, row: &RowBuffer) -> RowResult<bool> {
        let columns = self.layout.schematized_columns().len();
        while self.next_column < columns {
            let index = self.next_column;
            self.next_column += 1;
            let column = &self.layout.columns()[index];
            let present = match column.null_bit() {
                Some(bit) => row.read_bit(self.scope_offset, bit)?,
                None => true,
            };
            if present {
                self.cell = column.type_argument().clone();
                self.column = Some(index);
                return Ok(true);
            }
        }
        self.column = None;
        Ok(false)
    }

    pub(crate) fn move_next_sparse(&mut self, row: &RowBuffer) -> RowResult<bool> {
        self.column = None;
        self.in_sparse = true;
        let offset = if !self.started {
            self.started = true;
            self.index = 0;
            self.start
        } else if self.exists {
            let end = self.end(row)?;
            self.index += 1;
            end
        } else {
            return Ok(false);
        };
        self.load(row, offset)
    }

    /// Parses the field at `offset` as element `self.index`.
    pub(crate) fn load(&mut self, row: &RowBuffer, offset: usize) -> RowResult<bool> {
        self.meta_offset = offset;
        self.value_offset = offset;
        self.end_offset = None;
        self.path = FieldPath::None;
        self.coded_bool = None;
        self.write_path = None;

        let bounded = self.scope_type.is_sized_scope() || self.scope_type.is_fixed_arity();
        if bounded && self.index >= self.count {
            self.exists = false;
            return Ok(false);
        }

        let field = row.read_field(self, offset)?;
        if field.is_end {
            self.exists = false;
            return Ok(false);
        }
        self.path = field.path;
        self.cell = field.cell;
        self.coded_bool = field.coded_bool;
        self.value_offset = field.value_offset;
        self.exists = true;
        Ok(true)
    }

    /// End of the current field's value.
    pub(crate) fn end(&mut self, row: &RowBuffer) -> RowResult<usize> {
        if let Some(end) = self.end_offset {
            return Ok(end);
        }
        if !self.exists {
            return Err(RowError::Failure);
        }
        let end = row.value_end(
            self.value_offset,
            &self.cell,
            self.coded_bool.is_some(),
            &self.layout,
            self.depth + 1,
        )?;
        self.end_offset = Some(end);
        Ok(end)
    }

    /// Positions the cursor on the sparse field named `path` in a keyed
    /// scope. When absent, the cursor is left at the insertion point and
    /// `false` is returned. Either way the path to write is remembered.
    pub fn find(&mut self, row: &RowBuffer, path: &str) -> RowResult<bool> {
        if !self.scope_type.is_keyed_scope() || path.is_empty() {
            return Err(RowError::Failure);
        }
        self.started = false;
        self.exists = false;
        let mut found = false;
        while self.move_next_sparse(row)? {
            if self.path_str(row)? == Some(path) {
                found = true;
                break;
            }
        }
        self.write_path = Some(match self.layout.tokenizer().find_token(path) {
            Some(token) => SparsePath::Token(token),
            None => SparsePath::Text(path.into()),
        });
        Ok(found)
    }

    /// Path of the current field: the column path for schematized columns,
    /// the stored path for sparse fields of keyed scopes, `None` otherwise.
    pub fn path<'r>(&'r self, row: &'r RowBuffer) -> RowResult<Option<&'r str>> {
        match self.column() {
            Some(column) => Ok(Some(column.path())),
            None => self.path_str(row),
        }
    }

    pub(crate) fn path_str<'r>(&'r self, row: &'r RowBuffer) -> RowResult<Option<&'r str>> {
        match self.path {
            FieldPath::None => Ok(None),
            FieldPath::Token(token) => self
                .layout
                .tokenizer()
                .string(token)
                .map(Some)
                .ok_or(RowError::InvalidRow),
            FieldPath::Text { offset, len } => std::str::from_utf8(row.bytes_at(offset, len)?)
                .map(Some)
                .map_err(|_| RowError::InvalidRow),
        }
    }

    /// Moves every buffer offset held by the cursor by `delta`. Used after a
    /// write earlier in the row changed its length.
    pub(crate) fn shift(&mut self, delta: isize) {
        let apply = |v: usize| (v as isize + delta) as usize;
        self.start = apply(self.start);
        self.meta_offset = apply(self.meta_offset);
        self.value_offset = apply(self.value_offset);
        self.end_offset = self.end_offset.map(apply);
        if let FieldPath::Text { offset, len } = self.path {
            self.path = FieldPath::Text {
                offset: apply(offset),
                len,
            };
        }
    }

    /// Finishes the child scope `child` of the current field, moving this
    /// cursor's cached end past it. `child` is drained in the process.
    pub fn skip(&mut self, row: &RowBuffer, child: &mut RowCursor) -> RowResult<()> {
        if !self.exists
            || !self.cell.layout_type.is_scope()
            || child.scope_offset != self.value_offset
            || child.depth != self.depth + 1
        {
            return Err(RowError::Failure);
        }
        while child.move_next_sparse(row)? {}
        let terminator = match child.scope_type {
            LayoutType::Object | LayoutType::Udt => KEYED_SCOPE_END.len(),
            LayoutType::Array => 1,
            _ => 0,
        };
        self.end_offset = Some(child.meta_offset + terminator);
        Ok(())
    }
}
