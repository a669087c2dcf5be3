//! # Sparse Fields
//!
//! Sparse fields are self-describing: each one carries enough metadata to be
//! parsed without the schema. How much metadata depends on the enclosing
//! scope.
//!
//! ```text
//! keyed scope (object, udt)   [path][code][args][payload]
//! array, tuple                [code][args][payload]
//! typed scopes                [payload]
//! ```
//!
//! A path is a varuint `v`: `v < token_count` names a layout token,
//! otherwise `v - token_count` is the byte length of the UTF-8 path that
//! follows. Token 0 is the empty path, which no real field may use, so a
//! keyed scope ends with `[0][EndScope]`. Arrays end with `[EndScope]`. The
//! remaining scopes are bounded by a count or by their arity.
//!
//! Booleans in coded positions have no payload: `Boolean` means true and
//! `BooleanFalse` means false.
//!
//! ## Scope Bodies
//!
//! | Scope | Initial body |
//! |-------|--------------|
//! | object | `[0][EndScope]` |
//! | array | `[EndScope]` |
//! | udt | zeroed fixed segment, `[0][EndScope]` |
//! | typed-array, set, map | `u32` count `0` |
//! | tuple | one `Null` code per element |
//! | typed-tuple, tagged | the default value of each element |
//! | nullable | `has_value` flag, then the default inner value when set |
//!
//! ## Uniqueness
//!
//! Sets and maps are kept sorted by the encoded bytes of the element (set)
//! or key (map). Writers append freely while the scope is open; closing it
//! runs `typed_collection_unique_index_rebuild`.

use tracing::warn;

use crate::config::{MAX_NESTING_DEPTH, SCOPE_COUNT_SIZE};
use crate::encoding::{decode_varuint, encode_varuint_array};
use crate::layouts::{
    Layout, LayoutCode, LayoutType, MetaBytes, TypeArgument, TypeArgumentList,
};
use crate::row::buffer::RowBuffer;
use crate::row::cursor::{FieldPath, RowCursor, SparsePath};
use crate::row::value::RowValue;
use crate::row::{RowError, RowResult, UpdateOptions};
use crate::schema::StorageKind;

/// Terminator of an object or UDT sparse segment.
pub const KEYED_SCOPE_END: [u8; 2] = [0, LayoutCode::EndScope as u8];

/// Parsed metadata of one sparse field.
#[derive(Debug)]
pub(crate) struct FieldInfo {
    pub(crate) path: FieldPath,
    pub(crate) cell: TypeArgument,
    pub(crate) coded_bool: Option<bool>,
    pub(crate) value_offset: usize,
    pub(crate) is_end: bool,
}

impl FieldInfo {
    fn end(value_offset: usize) -> Self {
        FieldInfo {
            path: FieldPath::None,
            cell: TypeArgument::new(LayoutType::EndScope),
            coded_bool: None,
            value_offset,
            is_end: true,
        }
    }
}

/// What a sparse write places after the field metadata.
#[derive(Clone, Copy)]
enum Body<'v> {
    Value(&'v RowValue<'v>),
    Scope { has_value: bool },
}

impl RowBuffer {
    /// Parses the metadata of the field at `offset` inside `cursor`'s scope.
    pub(crate) fn read_field(&self, cursor: &RowCursor, offset: usize) -> RowResult<FieldInfo> {
        let scope = cursor.scope_type;
        if scope.is_typed_scope() {
            let cell = cursor
                .scope_type_args
                .element_type(scope, cursor.index)
                .ok_or(RowError::InvalidRow)?;
            return Ok(FieldInfo {
                path: FieldPath::None,
                cell,
                coded_bool: None,
                value_offset: offset,
                is_end: false,
            });
        }
        self.read_meta(
            offset,
            scope,
            cursor.layout.tokenizer().count(),
            cursor.depth + 1,
        )
    }

    /// Parses `[path][code][args]` (keyed) or `[code][args]` (array, tuple).
    fn read_meta(
        &self,
        offset: usize,
        scope: LayoutType,
        token_count: u64,
        depth: usize,
    ) -> RowResult<FieldInfo> {
        let mut pos = offset;
        let mut path = FieldPath::None;

        if scope.is_keyed_scope() {
            let (v, n) = decode_varuint(self.tail(pos)?)?;
            pos += n;
            if v == 0 {
                return match self.read_u8(pos)? {
                    code if code == LayoutCode::EndScope.as_u8() => Ok(FieldInfo::end(pos + 1)),
                    _ => Err(RowError::InvalidRow),
                };
            }
            if v < token_count {
                path = FieldPath::Token(v);
            } else {
                let len = usize::try_from(v - token_count).map_err(|_| RowError::InvalidRow)?;
                std::str::from_utf8(self.bytes_at(pos, len)?).map_err(|_| RowError::InvalidRow)?;
                path = FieldPath::Text { offset: pos, len };
                pos += len;
            }
        }

        let code = LayoutCode::try_from(self.read_u8(pos)?)?;
        pos += 1;
        if code == LayoutCode::EndScope {
            return match scope {
                LayoutType::Array => Ok(FieldInfo::end(pos)),
                _ => Err(RowError::InvalidRow),
            };
        }

        let layout_type = LayoutType::from_code(code)?;
        let coded_bool = match code {
            LayoutCode::Boolean => Some(true),
            LayoutCode::BooleanFalse => Some(false),
            _ => None,
        };
        let (type_args, n) = TypeArgumentList::decode_for(layout_type, self.tail(pos)?, depth)?;
        pos += n;

        Ok(FieldInfo {
            path,
            cell: TypeArgument {
                layout_type,
                type_args,
            },
            coded_bool,
            value_offset: pos,
            is_end: false,
        })
    }

    /// Offset just past the value of type `cell` starting at `offset`.
    /// `coded` is whether the value sits after a type code, which decides
    /// whether a boolean has a payload byte. `layout` supplies path tokens
    /// for keyed children.
    pub(crate) fn value_end(
        &self,
        offset: usize,
        cell: &TypeArgument,
        coded: bool,
        layout: &Layout,
        depth: usize,
    ) -> RowResult<usize> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RowError::InvalidRow);
        }
        let ty = cell.layout_type;
        let args = &cell.type_args;

        let end = match ty {
            LayoutType::Boolean if coded => offset,
            LayoutType::Utf8 | LayoutType::Binary => {
                let (len, n) = decode_varuint(self.tail(offset)?)?;
                let len = usize::try_from(len).map_err(|_| RowError::InvalidRow)?;
                offset
                    .checked_add(n)
                    .and_then(|v| v.checked_add(len))
                    .ok_or(RowError::InvalidRow)?
            }
            LayoutType::VarInt | LayoutType::VarUInt => {
                let (_, n) = decode_varuint(self.tail(offset)?)?;
                offset + n
            }
            LayoutType::Object | LayoutType::Array => {
                self.scan_terminated(offset, ty, layout, depth)?
            }
            LayoutType::Udt => {
                let child = self.resolve(args.schema_id(), RowError::InvalidRow)?;
                let sparse = self.sparse_start(offset, &child)?;
                self.scan_terminated(sparse, ty, &child, depth)?
            }
            LayoutType::TypedArray | LayoutType::TypedSet | LayoutType::TypedMap => {
                let count = self.read_u32(offset)?;
                let element = args.element_type(ty, 0).ok_or(RowError::InvalidRow)?;
                let mut pos = offset + SCOPE_COUNT_SIZE;
                for _ in 0..count {
                    pos = self.value_end(pos, &element, false, layout, depth + 1)?;
                }
                pos
            }
            LayoutType::Tuple => {
                let mut pos = offset;
                for _ in 0..args.len() {
                    let field = self.read_meta(pos, ty, 0, depth + 1)?;
                    if field.is_end {
                        return Err(RowError::InvalidRow);
                    }
                    pos = self.value_end(field.value_offset, &field.cell, true, layout, depth + 1)?;
                }
                pos
            }
            LayoutType::TypedTuple | LayoutType::Tagged | LayoutType::Tagged2 => {
                let mut pos = offset;
                for element in args.as_slice() {
                    pos = self.value_end(pos, element, false, layout, depth + 1)?;
                }
                pos
            }
            LayoutType::Nullable => match self.read_u8(offset)? {
                0 => offset + 1,
                1 => {
                    let inner = args.get(0).ok_or(RowError::InvalidRow)?;
                    self.value_end(offset + 1, inner, false, layout, depth + 1)?
                }
                _ => return Err(RowError::InvalidRow),
            },
            LayoutType::EndScope => return Err(RowError::InvalidRow),
            _ => {
                let size = ty.fixed_size().ok_or(RowError::InvalidRow)?;
                offset + size
            }
        };

        if end > self.buffer.len() {
            return Err(RowError::InvalidRow);
        }
        Ok(end)
    }

    /// Walks the fields of an object, array or UDT sparse segment and returns
    /// the offset past its terminator.
    fn scan_terminated(
        &self,
        mut pos: usize,
        scope: LayoutType,
        layout: &Layout,
        depth: usize,
    ) -> RowResult<usize> {
        let token_count = layout.tokenizer().count();
        loop {
            let field = self.read_meta(pos, scope, token_count, depth + 1)?;
            if field.is_end {
                return Ok(field.value_offset);
            }
            pos = self.value_end(field.value_offset, &field.cell, true, layout, depth + 1)?;
        }
    }

    /// Cursor over the scope held by `parent`'s current field.
    pub fn scope_cursor(&self, parent: &RowCursor) -> RowResult<RowCursor> {
        if !parent.exists {
            return Err(RowError::NotFound);
        }
        if parent.column.is_some() || !parent.cell.layout_type.is_scope() {
            return Err(RowError::TypeMismatch);
        }
        let depth = parent.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(RowError::InvalidRow);
        }

        let ty = parent.cell.layout_type;
        let args = parent.cell.type_args.clone();
        let offset = parent.value_offset;
        let (layout, start, count) = match ty {
            LayoutType::Udt => {
                let layout = self.resolve(args.schema_id(), RowError::InvalidRow)?;
                let start = self.sparse_start(offset, &layout)?;
                (layout, start, 0)
            }
            LayoutType::Object | LayoutType::Array => (parent.layout.clone(), offset, 0),
            LayoutType::TypedArray | LayoutType::TypedSet | LayoutType::TypedMap => {
                let count = self.read_u32(offset)? as usize;
                (parent.layout.clone(), offset + SCOPE_COUNT_SIZE, count)
            }
            LayoutType::Nullable => match self.read_u8(offset)? {
                flag @ (0 | 1) => (parent.layout.clone(), offset + 1, flag as usize),
                _ => return Err(RowError::InvalidRow),
            },
            _ => (parent.layout.clone(), offset, args.len()),
        };
        Ok(RowCursor::new_scope(layout, ty, args, offset, start, count, depth))
    }

    /// Reads the primitive value at the cursor. Nullable cells yield `Null`
    /// or their inner value.
    pub fn read_sparse(&self, cursor: &RowCursor) -> RowResult<RowValue<'_>> {
        if !cursor.exists || cursor.column.is_some() {
            return Err(RowError::NotFound);
        }
        if let Some(value) = cursor.coded_bool {
            return Ok(RowValue::Bool(value));
        }
        match cursor.cell.layout_type {
            LayoutType::Nullable => {
                let inner = cursor.cell.type_args.get(0).ok_or(RowError::InvalidRow)?;
                if !inner.layout_type.is_primitive() {
                    return Err(RowError::TypeMismatch);
                }
                match self.read_u8(cursor.value_offset)? {
                    0 => Ok(RowValue::Null),
                    1 => RowValue::read_payload(inner.layout_type, self.tail(cursor.value_offset + 1)?)
                        .map(|(value, _)| value),
                    _ => Err(RowError::InvalidRow),
                }
            }
            ty if ty.is_scope() => Err(RowError::TypeMismatch),
            ty => RowValue::read_payload(ty, self.tail(cursor.value_offset)?).map(|(value, _)| value),
        }
    }

    /// Writes a primitive value at the cursor and leaves the cursor on it.
    pub fn write_sparse(
        &mut self,
        cursor: &mut RowCursor,
        value: &RowValue<'_>,
        options: UpdateOptions,
    ) -> RowResult<()> {
        let cell = TypeArgument::new(value.layout_type());
        self.write_field(cursor, &cell, Body::Value(value), options)
    }

    /// Writes an empty scope of type `type_arg` at the cursor and returns a
    /// cursor over it.
    pub fn write_sparse_scope(
        &mut self,
        cursor: &mut RowCursor,
        type_arg: &TypeArgument,
        options: UpdateOptions,
    ) -> RowResult<RowCursor> {
        self.write_sparse_scope_with(cursor, type_arg, true, options)
    }

    /// As [`write_sparse_scope`](Self::write_sparse_scope); `has_value` is
    /// the initial flag of a nullable scope and ignored for other types.
    pub fn write_sparse_scope_with(
        &mut self,
        cursor: &mut RowCursor,
        type_arg: &TypeArgument,
        has_value: bool,
        options: UpdateOptions,
    ) -> RowResult<RowCursor> {
        if !type_arg.layout_type.is_scope() || !type_arg.is_well_formed() {
            return Err(RowError::TypeConstraint);
        }
        self.write_field(cursor, type_arg, Body::Scope { has_value }, options)?;
        self.scope_cursor(cursor)
    }

    fn write_field(
        &mut self,
        cursor: &mut RowCursor,
        cell: &TypeArgument,
        body: Body<'_>,
        options: UpdateOptions,
    ) -> RowResult<()> {
        let scope = cursor.scope_type;
        if !cursor.started || cursor.column.is_some() {
            return Err(RowError::Failure);
        }
        if options == UpdateOptions::InsertAt {
            if scope.is_keyed_scope() {
                return Err(RowError::Failure);
            }
            if scope.is_fixed_arity() {
                return Err(RowError::TypeConstraint);
            }
        }

        let (stored, wrap) = self.check_element_type(cursor, cell)?;
        if scope == LayoutType::Udt {
            self.check_declared(cursor, cell)?;
        }

        let replace = match (cursor.exists, options) {
            (true, UpdateOptions::Insert) => return Err(RowError::Exists),
            (true, UpdateOptions::InsertAt) => false,
            (true, _) => true,
            (false, UpdateOptions::Update) => return Err(RowError::NotFound),
            (false, _) => false,
        };

        let mut bytes = MetaBytes::new();
        if scope.is_keyed_scope() {
            self.encode_path(cursor, &mut bytes)?;
        }
        let coded = !scope.is_typed_scope();
        if coded {
            let code = match body {
                Body::Value(RowValue::Bool(v)) => LayoutType::bool_code(*v),
                _ => stored.layout_type.code(),
            };
            bytes.push(code.as_u8());
            stored.type_args.encode_for(stored.layout_type, &mut bytes);
        }
        match body {
            Body::Value(value) if wrap => {
                bytes.push(!matches!(value, RowValue::Null) as u8);
                value.write_payload(&mut bytes);
            }
            Body::Value(RowValue::Bool(_)) if coded => {}
            Body::Value(value) => value.write_payload(&mut bytes),
            Body::Scope { has_value } => self.default_body(&stored, has_value, cursor.depth + 1, &mut bytes)?,
        }

        let meta_offset = cursor.meta_offset;
        let range_end = if replace { cursor.end(self)? } else { meta_offset };
        self.splice(meta_offset..range_end, &bytes)?;
        if !replace && scope.is_sized_scope() {
            cursor.count += 1;
            self.write_u32(cursor.scope_offset, cursor.count as u32)?;
        }

        let write_path = cursor.write_path.take();
        if !cursor.load(self, meta_offset)? {
            return Err(RowError::InvalidRow);
        }
        cursor.write_path = write_path;
        cursor.end_offset = Some(meta_offset + bytes.len());
        Ok(())
    }

    /// Returns the type to store for a value of type `cell` at the cursor,
    /// and whether it must be wrapped in the nullable the scope declares.
    fn check_element_type(&self, cursor: &RowCursor, cell: &TypeArgument) -> RowResult<(TypeArgument, bool)> {
        let scope = cursor.scope_type;
        if scope.is_fixed_arity() && !cursor.exists {
            return Err(RowError::TypeConstraint);
        }
        if scope.is_typed_scope() {
            let expected = cursor
                .scope_type_args
                .element_type(scope, cursor.index)
                .ok_or(RowError::TypeConstraint)?;
            if expected == *cell {
                return Ok((expected, false));
            }
            let wraps = expected.layout_type == LayoutType::Nullable
                && (cell.layout_type == LayoutType::Null || expected.type_args.get(0) == Some(cell));
            return match wraps {
                true => Ok((expected, true)),
                false => Err(RowError::TypeConstraint),
            };
        }
        if scope == LayoutType::Tuple {
            let expected = cursor
                .scope_type_args
                .get(cursor.index)
                .ok_or(RowError::TypeConstraint)?;
            if expected != cell && cell.layout_type != LayoutType::Null {
                return Err(RowError::TypeConstraint);
            }
        }
        Ok((cell.clone(), false))
    }

    /// Enforces declared sparse column types and the unschematized policy
    /// at the top level of a UDT.
    fn check_declared(&self, cursor: &RowCursor, cell: &TypeArgument) -> RowResult<()> {
        let declared = match &cursor.write_path {
            Some(SparsePath::Token(token)) => cursor.layout.tokenizer().string(*token),
            Some(SparsePath::Text(_)) => None,
            None => cursor.path_str(self)?,
        }
        .and_then(|path| cursor.layout.find(path))
        .filter(|column| column.parent().is_none());

        match declared {
            Some(column) if column.storage() != StorageKind::Sparse => Err(RowError::TypeConstraint),
            Some(column) if column.type_argument() != cell && cell.layout_type != LayoutType::Null => {
                Err(RowError::TypeConstraint)
            }
            Some(_) => Ok(()),
            None if cursor.layout.allow_unschematized() => Ok(()),
            None => Err(RowError::TypeConstraint),
        }
    }

    fn encode_path(&self, cursor: &RowCursor, out: &mut MetaBytes) -> RowResult<()> {
        let token_count = cursor.layout.tokenizer().count();
        let (text, token) = match (&cursor.write_path, cursor.path) {
            (Some(SparsePath::Token(token)), _) => (None, *token),
            (Some(SparsePath::Text(text)), _) => (Some(text.as_bytes()), 0),
            (None, FieldPath::Token(token)) => (None, token),
            (None, FieldPath::Text { offset, len }) => (Some(self.bytes_at(offset, len)?), 0),
            (None, FieldPath::None) => return Err(RowError::Failure),
        };
        let v = match text {
            Some(text) => token_count + text.len() as u64,
            None => token,
        };
        let (buf, n) = encode_varuint_array(v);
        out.extend_from_slice(&buf[..n]);
        if let Some(text) = text {
            out.extend_from_slice(text);
        }
        Ok(())
    }

    /// Initial bytes of a scope value of type `arg`.
    fn default_body(&self, arg: &TypeArgument, has_value: bool, depth: usize, out: &mut MetaBytes) -> RowResult<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RowError::TooBig);
        }
        match arg.layout_type {
            LayoutType::Object => out.extend_from_slice(&KEYED_SCOPE_END),
            LayoutType::Array => out.push(LayoutCode::EndScope.as_u8()),
            LayoutType::Udt => {
                let layout = self.resolve(arg.type_args.schema_id(), RowError::NotFound)?;
                out.extend(std::iter::repeat(0u8).take(layout.size()));
                out.extend_from_slice(&KEYED_SCOPE_END);
            }
            LayoutType::TypedArray | LayoutType::TypedSet | LayoutType::TypedMap => {
                out.extend_from_slice(&0u32.to_le_bytes());
            }
            LayoutType::Tuple => {
                for _ in 0..arg.type_args.len() {
                    out.push(LayoutCode::Null.as_u8());
                }
            }
            LayoutType::TypedTuple | LayoutType::Tagged | LayoutType::Tagged2 => {
                for element in arg.type_args.as_slice() {
                    self.default_body(element, false, depth + 1, out)?;
                }
            }
            LayoutType::Nullable => {
                out.push(has_value as u8);
                if has_value {
                    let inner = arg.type_args.get(0).ok_or(RowError::TypeConstraint)?;
                    self.default_body(inner, false, depth + 1, out)?;
                }
            }
            LayoutType::Utf8 | LayoutType::Binary | LayoutType::VarInt | LayoutType::VarUInt => out.push(0),
            ty => {
                let size = ty.fixed_size().ok_or(RowError::TypeConstraint)?;
                out.extend(std::iter::repeat(0u8).take(size));
            }
        }
        Ok(())
    }

    /// Removes the field at the cursor. The cursor moves onto whatever
    /// follows, keeping its index.
    pub fn delete_sparse(&mut self, cursor: &mut RowCursor) -> RowResult<()> {
        if !cursor.exists || cursor.column.is_some() {
            return Err(RowError::NotFound);
        }
        if cursor.scope_type.is_fixed_arity() {
            return Err(RowError::TypeConstraint);
        }
        let meta_offset = cursor.meta_offset;
        let end = cursor.end(self)?;
        self.splice(meta_offset..end, &[])?;
        if cursor.scope_type.is_sized_scope() {
            cursor.count -= 1;
            self.write_u32(cursor.scope_offset, cursor.count as u32)?;
        }
        cursor.load(self, meta_offset)?;
        Ok(())
    }

    /// Writes the cursor's element count into its scope's count prefix.
    pub fn patch_scope_count(&mut self, cursor: &RowCursor) -> RowResult<()> {
        if !cursor.scope_type.is_sized_scope() {
            return Err(RowError::Failure);
        }
        let count = u32::try_from(cursor.count).map_err(|_| RowError::TooBig)?;
        self.write_u32(cursor.scope_offset, count)
    }

    /// Sorts a set or map scope by element (set) or key (map) bytes.
    ///
    /// Duplicates are resolved by `options`: `Upsert` keeps the last written
    /// occurrence; anything else leaves them in place (sorted) and fails
    /// with `Exists`. The cursor is rewound to the start of the scope.
    pub fn typed_collection_unique_index_rebuild(
        &mut self,
        scope: &mut RowCursor,
        options: UpdateOptions,
    ) -> RowResult<()> {
        let ty = scope.scope_type;
        if !ty.is_unique_scope() {
            return Err(RowError::Failure);
        }
        let element = scope
            .scope_type_args
            .element_type(ty, 0)
            .ok_or(RowError::InvalidRow)?;
        let key = match ty {
            LayoutType::TypedMap => scope.scope_type_args.get(0).cloned(),
            _ => None,
        };

        // Every element encodes to at least one byte.
        let count = self.read_u32(scope.scope_offset)? as usize;
        if count > self.buffer.len().saturating_sub(scope.start) {
            return Err(RowError::InvalidRow);
        }
        let mut spans = Vec::with_capacity(count);
        let mut pos = scope.start;
        for _ in 0..count {
            let end = self.value_end(pos, &element, false, &scope.layout, scope.depth + 1)?;
            let key_end = match &key {
                Some(key) => self.value_end(pos, key, false, &scope.layout, scope.depth + 1)?,
                None => end,
            };
            spans.push((pos, key_end, end));
            pos = end;
        }
        let body_end = pos;

        let buf = &self.buffer;
        let key_of = |i: usize| &buf[spans[i].0..spans[i].1];
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| key_of(a).cmp(key_of(b)));

        let has_duplicates = order.windows(2).any(|w| key_of(w[0]) == key_of(w[1]));
        let dedupe = has_duplicates && options == UpdateOptions::Upsert;
        let kept: Vec<usize> = if dedupe {
            order
                .iter()
                .enumerate()
                .filter(|&(n, &i)| order.get(n + 1).map_or(true, |&next| key_of(next) != key_of(i)))
                .map(|(_, &i)| i)
                .collect()
        } else {
            order
        };

        let mut body = Vec::with_capacity(body_end - scope.start);
        for &i in &kept {
            body.extend_from_slice(&buf[spans[i].0..spans[i].2]);
        }
        self.splice(scope.start..body_end, &body)?;

        scope.count = kept.len();
        self.patch_scope_count(scope)?;
        scope.started = false;
        scope.exists = false;
        scope.index = 0;
        scope.meta_offset = scope.start;

        if has_duplicates && !dedupe {
            warn!(scope = %ty, elements = count, "duplicate keys in unique scope");
            return Err(RowError::Exists);
        }
        Ok(())
    }
}
