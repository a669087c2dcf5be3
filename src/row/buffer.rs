//! # Row Buffer
//!
//! `RowBuffer` owns the bytes of one row and implements the byte-level
//! encoding rules. Higher layers (`RowCursor`, `RowReader`, `RowWriter`)
//! only compute offsets and delegate every read and write here.
//!
//! ## Row Layout
//!
//! ```text
//! +--------+-------------------------------+------------------+-------------------+
//! | header | fixed segment                 | variable segment | sparse segment    |
//! | 5 B    | bitmap | fixed cols | slots   | payloads         | fields .. [0][70] |
//! +--------+-------------------------------+------------------+-------------------+
//! ```
//!
//! The same fixed / variable / sparse shape is repeated for every nested UDT
//! scope, starting at the scope's value offset. Variable slot `i` holds the
//! end of column `i`'s payload relative to the start of the variable
//! segment, so column `i` spans `[slot[i-1], slot[i])` and an absent column
//! spans nothing.
//!
//! ## Growth
//!
//! Every write that changes the length goes through `splice`, which asks the
//! configured [`BufferResizer`] for capacity first. All offsets after the
//! splice point move by the returned delta; cursors positioned there are
//! stale unless their owner shifts them.
//!
//! ## Validation
//!
//! Reads are bounds-checked. Malformed bytes surface as
//! `RowError::InvalidRow`; they never panic.

use std::ops::Range;
use std::sync::Arc;

use eyre::{ensure, Result};
use tracing::trace;

use crate::config::{
    DEFAULT_INITIAL_CAPACITY, HYBRID_ROW_VERSION_V1, ROW_HEADER_SIZE, SCOPE_COUNT_SIZE,
    VARIABLE_SLOT_SIZE,
};
use crate::layouts::{Layout, LayoutBit, LayoutColumn, LayoutResolver, MetaBytes};
use crate::row::header::RowHeader;
use crate::row::resizer::{BufferResizer, DefaultResizer};
use crate::row::sparse::KEYED_SCOPE_END;
use crate::row::value::RowValue;
use crate::row::{RowError, RowResult};
use crate::schema::{SchemaId, StorageKind};
use zerocopy::IntoBytes;

#[derive(Debug)]
pub struct RowBuffer {
    pub(super) buffer: Vec<u8>,
    pub(super) resolver: Arc<dyn LayoutResolver>,
    pub(super) resizer: Box<dyn BufferResizer>,
    pub(super) layout: Option<Arc<Layout>>,
}

/// Builder for [`RowBuffer`] with a non-default capacity or growth policy.
///
/// ```ignore
/// let row = RowBuffer::builder()
///     .resolver(resolver)
///     .initial_capacity(1024)
///     .resizer(BoundedResizer::new(64 * 1024))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct RowBufferBuilder {
    resolver: Option<Arc<dyn LayoutResolver>>,
    resizer: Option<Box<dyn BufferResizer>>,
    initial_capacity: Option<usize>,
}

impl RowBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(mut self, resolver: Arc<dyn LayoutResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn resizer(mut self, resizer: impl BufferResizer + 'static) -> Self {
        self.resizer = Some(Box::new(resizer));
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<RowBuffer> {
        let resolver = self
            .resolver
            .ok_or_else(|| eyre::eyre!("RowBuffer requires a layout resolver"))?;
        let resizer = self
            .resizer
            .unwrap_or_else(|| Box::new(DefaultResizer::default()));
        let capacity = self.initial_capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY);
        ensure!(
            capacity <= resizer.max_size(),
            "initial capacity {} exceeds the resizer maximum of {}",
            capacity,
            resizer.max_size()
        );

        Ok(RowBuffer {
            buffer: Vec::with_capacity(capacity),
            resolver,
            resizer,
            layout: None,
        })
    }
}

impl RowBuffer {
    pub fn new(resolver: Arc<dyn LayoutResolver>) -> Self {
        Self {
            buffer: Vec::with_capacity(DEFAULT_INITIAL_CAPACITY),
            resolver,
            resizer: Box::new(DefaultResizer::default()),
            layout: None,
        }
    }

    pub fn builder() -> RowBufferBuilder {
        RowBufferBuilder::new()
    }

    /// Resets the buffer to an empty row of `layout`: header, zeroed fixed
    /// segment, no variable payloads, and an empty sparse segment.
    pub fn init_layout(&mut self, version: u8, layout: Arc<Layout>) -> RowResult<()> {
        if version != HYBRID_ROW_VERSION_V1 || !layout.schema_id().is_valid() {
            return Err(RowError::Failure);
        }
        let required = ROW_HEADER_SIZE + layout.size() + KEYED_SCOPE_END.len();
        self.buffer.clear();
        self.ensure_capacity(required)?;

        let header = RowHeader::new(version, layout.schema_id());
        self.buffer.extend_from_slice(header.as_bytes());
        self.buffer.resize(ROW_HEADER_SIZE + layout.size(), 0);
        self.buffer.extend_from_slice(&KEYED_SCOPE_END);
        self.layout = Some(layout);
        Ok(())
    }

    /// Replaces the contents with an existing encoded row. Only the header and
    /// the root fixed segment are validated here; the rest is checked lazily.
    pub fn read_from(&mut self, bytes: &[u8]) -> RowResult<()> {
        let header = RowHeader::from_bytes(bytes)?;
        let layout = self
            .resolver
            .resolve(header.schema())
            .ok_or(RowError::NotFound)?;
        if bytes.len() < ROW_HEADER_SIZE + layout.size() + KEYED_SCOPE_END.len() {
            return Err(RowError::InvalidRow);
        }

        self.buffer.clear();
        self.ensure_capacity(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        self.layout = Some(layout);
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8], resolver: Arc<dyn LayoutResolver>) -> RowResult<Self> {
        let mut row = Self::new(resolver);
        row.read_from(bytes)?;
        Ok(row)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn header(&self) -> RowResult<&RowHeader> {
        RowHeader::from_bytes(&self.buffer)
    }

    pub fn schema_id(&self) -> RowResult<SchemaId> {
        Ok(self.header()?.schema())
    }

    /// Layout of the root scope. `Failure` until the buffer is initialized.
    pub fn layout(&self) -> RowResult<&Arc<Layout>> {
        self.layout.as_ref().ok_or(RowError::Failure)
    }

    pub fn resolver(&self) -> &Arc<dyn LayoutResolver> {
        &self.resolver
    }

    pub(super) fn resolve(&self, schema_id: Option<SchemaId>, missing: RowError) -> RowResult<Arc<Layout>> {
        let id = schema_id.ok_or(RowError::InvalidRow)?;
        if let Some(root) = &self.layout {
            if root.schema_id() == id {
                return Ok(Arc::clone(root));
            }
        }
        self.resolver.resolve(id).ok_or(missing)
    }

    pub(super) fn tail(&self, offset: usize) -> RowResult<&[u8]> {
        self.buffer.get(offset..).ok_or(RowError::InvalidRow)
    }

    pub(super) fn bytes_at(&self, offset: usize, len: usize) -> RowResult<&[u8]> {
        let end = offset.checked_add(len).ok_or(RowError::InvalidRow)?;
        self.buffer.get(offset..end).ok_or(RowError::InvalidRow)
    }

    pub(super) fn read_u8(&self, offset: usize) -> RowResult<u8> {
        self.buffer.get(offset).copied().ok_or(RowError::InvalidRow)
    }

    pub(super) fn read_u32(&self, offset: usize) -> RowResult<u32> {
        let raw = self.bytes_at(offset, SCOPE_COUNT_SIZE)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(raw);
        Ok(u32::from_le_bytes(out))
    }

    pub(super) fn write_u32(&mut self, offset: usize, value: u32) -> RowResult<()> {
        let end = offset.checked_add(4).ok_or(RowError::InvalidRow)?;
        let slot = self.buffer.get_mut(offset..end).ok_or(RowError::InvalidRow)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn ensure_capacity(&mut self, required: usize) -> RowResult<()> {
        if required > self.resizer.max_size() {
            return Err(RowError::TooBig);
        }
        let capacity = self.buffer.capacity();
        if required > capacity {
            let target = self.resizer.grow(capacity, required)?;
            trace!(from = capacity, to = target, "growing row buffer");
            self.buffer.reserve_exact(target - self.buffer.len());
        }
        Ok(())
    }

    /// Replaces `range` with `bytes`, returning the change in length.
    pub(super) fn splice(&mut self, range: Range<usize>, bytes: &[u8]) -> RowResult<isize> {
        if range.start > range.end || range.end > self.buffer.len() {
            return Err(RowError::InvalidRow);
        }
        let removed = range.end - range.start;
        let new_len = self.buffer.len() - removed + bytes.len();
        if bytes.len() > removed {
            self.ensure_capacity(new_len)?;
        }
        self.buffer.splice(range, bytes.iter().copied());
        Ok(bytes.len() as isize - removed as isize)
    }

    pub fn read_bit(&self, scope_offset: usize, bit: LayoutBit) -> RowResult<bool> {
        let byte = self.read_u8(scope_offset + bit.byte_offset())?;
        Ok(byte & bit.mask() != 0)
    }

    pub fn set_bit(&mut self, scope_offset: usize, bit: LayoutBit) -> RowResult<()> {
        let byte = self
            .buffer
            .get_mut(scope_offset + bit.byte_offset())
            .ok_or(RowError::InvalidRow)?;
        *byte |= bit.mask();
        Ok(())
    }

    pub fn unset_bit(&mut self, scope_offset: usize, bit: LayoutBit) -> RowResult<()> {
        let byte = self
            .buffer
            .get_mut(scope_offset + bit.byte_offset())
            .ok_or(RowError::InvalidRow)?;
        *byte &= !bit.mask();
        Ok(())
    }

    /// Reads a fixed column of the UDT scope whose fixed segment starts at
    /// `scope_offset`. `NotFound` when the column's null bit is clear.
    pub fn read_fixed(&self, scope_offset: usize, column: &LayoutColumn) -> RowResult<RowValue<'_>> {
        if column.storage() != StorageKind::Fixed {
            return Err(RowError::Failure);
        }
        if let Some(bit) = column.null_bit() {
            if !self.read_bit(scope_offset, bit)? {
                return Err(RowError::NotFound);
            }
        }
        let raw = self.bytes_at(scope_offset + column.offset(), column.size())?;
        let ty = column.layout_type();
        if ty.is_length_prefixed() {
            RowValue::from_raw(ty, raw)
        } else {
            RowValue::read_payload(ty, raw).map(|(value, _)| value)
        }
    }

    pub fn write_fixed(
        &mut self,
        scope_offset: usize,
        column: &LayoutColumn,
        value: &RowValue<'_>,
    ) -> RowResult<()> {
        if column.storage() != StorageKind::Fixed {
            return Err(RowError::Failure);
        }
        if value.layout_type() != column.layout_type() {
            return Err(RowError::TypeConstraint);
        }

        let mut encoded = MetaBytes::new();
        match value.as_raw_bytes() {
            Some(raw) if raw.len() > column.size() => return Err(RowError::TooBig),
            Some(raw) if raw.len() < column.size() => return Err(RowError::TypeConstraint),
            Some(raw) => encoded.extend_from_slice(raw),
            None => value.write_payload(&mut encoded),
        }

        let start = scope_offset + column.offset();
        let dst = self
            .buffer
            .get_mut(start..start + column.size())
            .ok_or(RowError::InvalidRow)?;
        dst.copy_from_slice(&encoded);
        if let Some(bit) = column.null_bit() {
            self.set_bit(scope_offset, bit)?;
        }
        Ok(())
    }

    /// Clears a nullable fixed column. Non-nullable columns cannot be cleared.
    pub fn delete_fixed(&mut self, scope_offset: usize, column: &LayoutColumn) -> RowResult<()> {
        if column.storage() != StorageKind::Fixed {
            return Err(RowError::Failure);
        }
        let bit = column.null_bit().ok_or(RowError::TypeConstraint)?;
        let start = scope_offset + column.offset();
        let dst = self
            .buffer
            .get_mut(start..start + column.size())
            .ok_or(RowError::InvalidRow)?;
        dst.fill(0);
        self.unset_bit(scope_offset, bit)
    }

    fn read_slot(&self, scope_offset: usize, layout: &Layout, index: usize) -> RowResult<usize> {
        Ok(self.read_u32(scope_offset + layout.variable_slot_offset(index))? as usize)
    }

    /// Absolute `(start, end)` of the variable segment of a UDT scope.
    pub(super) fn variable_segment(&self, scope_offset: usize, layout: &Layout) -> RowResult<(usize, usize)> {
        let start = scope_offset + layout.size();
        let len = match layout.num_variable() {
            0 => 0,
            n => self.read_slot(scope_offset, layout, n - 1)?,
        };
        let end = start.checked_add(len).ok_or(RowError::InvalidRow)?;
        if end > self.buffer.len() {
            return Err(RowError::InvalidRow);
        }
        Ok((start, end))
    }

    /// Offset of the first sparse field of a UDT scope.
    pub(super) fn sparse_start(&self, scope_offset: usize, layout: &Layout) -> RowResult<usize> {
        self.variable_segment(scope_offset, layout).map(|(_, end)| end)
    }

    fn variable_bounds(
        &self,
        scope_offset: usize,
        layout: &Layout,
        index: usize,
    ) -> RowResult<(usize, usize)> {
        let base = scope_offset + layout.size();
        let begin = match index {
            0 => 0,
            i => self.read_slot(scope_offset, layout, i - 1)?,
        };
        let end = self.read_slot(scope_offset, layout, index)?;
        if begin > end || base + end > self.buffer.len() {
            return Err(RowError::InvalidRow);
        }
        Ok((base + begin, base + end))
    }

    pub fn read_variable(
        &self,
        scope_offset: usize,
        layout: &Layout,
        column: &LayoutColumn,
    ) -> RowResult<RowValue<'_>> {
        if column.storage() != StorageKind::Variable {
            return Err(RowError::Failure);
        }
        let bit = column.null_bit().ok_or(RowError::InvalidRow)?;
        if !self.read_bit(scope_offset, bit)? {
            return Err(RowError::NotFound);
        }
        let (start, end) = self.variable_bounds(scope_offset, layout, column.variable_index())?;
        let (value, consumed) = RowValue::read_payload(column.layout_type(), &self.buffer[start..end])?;
        if consumed != end - start {
            return Err(RowError::InvalidRow);
        }
        Ok(value)
    }

    /// Writes a variable column, shifting everything after it. Returns the
    /// change in row length.
    pub fn write_variable(
        &mut self,
        scope_offset: usize,
        layout: &Layout,
        column: &LayoutColumn,
        value: &RowValue<'_>,
    ) -> RowResult<isize> {
        if column.storage() != StorageKind::Variable {
            return Err(RowError::Failure);
        }
        if value.layout_type() != column.layout_type() {
            return Err(RowError::TypeConstraint);
        }
        let mut payload = MetaBytes::new();
        value.write_payload(&mut payload);
        let delta = self.replace_variable(scope_offset, layout, column, &payload)?;
        let bit = column.null_bit().ok_or(RowError::InvalidRow)?;
        self.set_bit(scope_offset, bit)?;
        Ok(delta)
    }

    pub fn delete_variable(
        &mut self,
        scope_offset: usize,
        layout: &Layout,
        column: &LayoutColumn,
    ) -> RowResult<isize> {
        if column.storage() != StorageKind::Variable {
            return Err(RowError::Failure);
        }
        let delta = self.replace_variable(scope_offset, layout, column, &[])?;
        let bit = column.null_bit().ok_or(RowError::InvalidRow)?;
        self.unset_bit(scope_offset, bit)?;
        Ok(delta)
    }

    fn replace_variable(
        &mut self,
        scope_offset: usize,
        layout: &Layout,
        column: &LayoutColumn,
        payload: &[u8],
    ) -> RowResult<isize> {
        let index = column.variable_index();
        let (start, end) = self.variable_bounds(scope_offset, layout, index)?;
        let delta = payload.len() as isize - (end - start) as isize;

        let last = self.read_slot(scope_offset, layout, layout.num_variable() - 1)?;
        let new_last = last as isize + delta;
        if new_last < 0 || new_last > u32::MAX as isize {
            return Err(RowError::TooBig);
        }

        self.splice(start..end, payload)?;
        for i in index..layout.num_variable() {
            let slot_offset = scope_offset + layout.variable_slot_offset(i);
            let slot = self.read_u32(slot_offset)? as isize + delta;
            self.write_u32(slot_offset, slot as u32)?;
        }
        Ok(delta)
    }
}

const _: () = assert!(VARIABLE_SLOT_SIZE == SCOPE_COUNT_SIZE);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::{LayoutBuilder, LayoutType, StaticResolver};
    use crate::row::resizer::BoundedResizer;

    fn layout() -> Arc<Layout> {
        let mut b = LayoutBuilder::new("T", SchemaId(1));
        b.add_fixed_column("a", LayoutType::Int32, true, 0).unwrap();
        b.add_fixed_column("code", LayoutType::Utf8, false, 3).unwrap();
        b.add_variable_column("x", LayoutType::Utf8).unwrap();
        b.add_variable_column("y", LayoutType::VarInt).unwrap();
        Arc::new(b.build().unwrap())
    }

    fn row(layout: &Arc<Layout>) -> RowBuffer {
        let resolver = Arc::new(StaticResolver::new([(**layout).clone()]));
        let mut row = RowBuffer::new(resolver);
        row.init_layout(HYBRID_ROW_VERSION_V1, Arc::clone(layout)).unwrap();
        row
    }

    #[test]
    fn init_layout_writes_header_zeroed_fixed_segment_and_end_scope() {
        let layout = layout();
        let row = row(&layout);
        let bytes = row.as_bytes();
        assert_eq!(bytes.len(), ROW_HEADER_SIZE + layout.size() + 2);
        assert_eq!(&bytes[..5], &[0x81, 1, 0, 0, 0]);
        assert!(bytes[5..5 + layout.size()].iter().all(|&b| b == 0));
        assert_eq!(&bytes[bytes.len() - 2..], &KEYED_SCOPE_END);
    }

    #[test]
    fn fixed_columns_respect_null_bits() {
        let layout = layout();
        let mut row = row(&layout);
        let a = layout.find("a").unwrap();
        assert_eq!(row.read_fixed(ROW_HEADER_SIZE, a).unwrap_err(), RowError::NotFound);

        row.write_fixed(ROW_HEADER_SIZE, a, &RowValue::Int32(-7)).unwrap();
        assert_eq!(row.read_fixed(ROW_HEADER_SIZE, a).unwrap(), RowValue::Int32(-7));

        row.delete_fixed(ROW_HEADER_SIZE, a).unwrap();
        assert_eq!(row.read_fixed(ROW_HEADER_SIZE, a).unwrap_err(), RowError::NotFound);
    }

    #[test]
    fn fixed_strings_require_exact_length() {
        let layout = layout();
        let mut row = row(&layout);
        let code = layout.find("code").unwrap();
        row.write_fixed(ROW_HEADER_SIZE, code, &RowValue::Utf8("abc")).unwrap();
        assert_eq!(row.read_fixed(ROW_HEADER_SIZE, code).unwrap(), RowValue::Utf8("abc"));
        assert_eq!(
            row.write_fixed(ROW_HEADER_SIZE, code, &RowValue::Utf8("abcd")).unwrap_err(),
            RowError::TooBig
        );
        assert_eq!(
            row.write_fixed(ROW_HEADER_SIZE, code, &RowValue::Utf8("ab")).unwrap_err(),
            RowError::TypeConstraint
        );
        assert_eq!(
            row.write_fixed(ROW_HEADER_SIZE, code, &RowValue::Int32(1)).unwrap_err(),
            RowError::TypeConstraint
        );
        assert_eq!(row.delete_fixed(ROW_HEADER_SIZE, code).unwrap_err(), RowError::TypeConstraint);
    }

    #[test]
    fn variable_writes_shift_later_columns() {
        let layout = layout();
        let mut row = row(&layout);
        let x = layout.find("x").unwrap();
        let y = layout.find("y").unwrap();
        let base_len = row.len();

        assert_eq!(row.write_variable(ROW_HEADER_SIZE, &layout, y, &RowValue::VarInt(-300)).unwrap(), 2);
        assert_eq!(row.write_variable(ROW_HEADER_SIZE, &layout, x, &RowValue::Utf8("hello")).unwrap(), 6);
        assert_eq!(row.len(), base_len + 8);
        assert_eq!(row.read_variable(ROW_HEADER_SIZE, &layout, x).unwrap(), RowValue::Utf8("hello"));
        assert_eq!(row.read_variable(ROW_HEADER_SIZE, &layout, y).unwrap(), RowValue::VarInt(-300));

        assert_eq!(row.write_variable(ROW_HEADER_SIZE, &layout, x, &RowValue::Utf8("hi")).unwrap(), -3);
        assert_eq!(row.read_variable(ROW_HEADER_SIZE, &layout, y).unwrap(), RowValue::VarInt(-300));

        assert_eq!(row.delete_variable(ROW_HEADER_SIZE, &layout, x).unwrap(), -3);
        assert_eq!(row.read_variable(ROW_HEADER_SIZE, &layout, x).unwrap_err(), RowError::NotFound);
        assert_eq!(row.read_variable(ROW_HEADER_SIZE, &layout, y).unwrap(), RowValue::VarInt(-300));
        assert_eq!(
            row.sparse_start(ROW_HEADER_SIZE, &layout).unwrap(),
            ROW_HEADER_SIZE + layout.size() + 2
        );
    }

    #[test]
    fn bounded_resizer_reports_too_big() {
        let layout = layout();
        let resolver = Arc::new(StaticResolver::new([(*layout).clone()]));
        let mut row = RowBuffer::builder()
            .resolver(resolver)
            .initial_capacity(32)
            .resizer(BoundedResizer::new(48))
            .build()
            .unwrap();
        row.init_layout(HYBRID_ROW_VERSION_V1, Arc::clone(&layout)).unwrap();

        let x = layout.find("x").unwrap();
        let long = "z".repeat(64);
        assert_eq!(
            row.write_variable(ROW_HEADER_SIZE, &layout, x, &RowValue::Utf8(&long)).unwrap_err(),
            RowError::TooBig
        );
        row.write_variable(ROW_HEADER_SIZE, &layout, x, &RowValue::Utf8("ok")).unwrap();
    }

    #[test]
    fn builder_requires_resolver() {
        assert!(RowBuffer::builder().build().is_err());
    }

    #[test]
    fn read_from_validates_header_and_size() {
        let layout = layout();
        let written = row(&layout);
        let resolver: Arc<dyn LayoutResolver> = Arc::new(StaticResolver::new([(*layout).clone()]));

        let copy = RowBuffer::from_bytes(written.as_bytes(), Arc::clone(&resolver)).unwrap();
        assert_eq!(copy.as_bytes(), written.as_bytes());
        assert_eq!(copy.schema_id().unwrap(), SchemaId(1));

        let truncated = &written.as_bytes()[..ROW_HEADER_SIZE + 2];
        assert_eq!(
            RowBuffer::from_bytes(truncated, Arc::clone(&resolver)).unwrap_err(),
            RowError::InvalidRow
        );
        let mut unknown = written.as_bytes().to_vec();
        unknown[1] = 9;
        assert_eq!(RowBuffer::from_bytes(&unknown, resolver).unwrap_err(), RowError::NotFound);
    }
}
