//! # Layout Builder
//!
//! Accumulates columns in declaration order and assigns physical positions in
//! [`LayoutBuilder::build`]. The compiler drives it; tests and callers with
//! hand-made layouts can use it directly.
//!
//! ```ignore
//! let mut b = LayoutBuilder::new("Person", SchemaId(1));
//! b.add_fixed_column("age", LayoutType::Int32, true, 0)?;
//! b.add_variable_column("name", LayoutType::Utf8)?;
//! b.add_object_scope("address", TypeArgument::object())?;
//! b.add_sparse_column("city", TypeArgument::new(LayoutType::Utf8))?;
//! b.end_object_scope()?;
//! let layout = b.build()?;
//! ```

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use tracing::debug;

use crate::config::VARIABLE_SLOT_SIZE;
use crate::layouts::layout::{Layout, LayoutBit, LayoutColumn};
use crate::layouts::layout_type::{LayoutType, TypeArgument};
use crate::layouts::tokenizer::StringTokenizer;
use crate::schema::{SchemaId, StorageKind};

#[derive(Debug)]
struct PendingColumn {
    path: String,
    full_path: String,
    type_arg: TypeArgument,
    nullable: bool,
    size: usize,
    bit: Option<usize>,
    parent: Option<usize>,
}

#[derive(Debug)]
pub struct LayoutBuilder {
    name: String,
    schema_id: SchemaId,
    fixed: Vec<PendingColumn>,
    variable: Vec<PendingColumn>,
    sparse: Vec<PendingColumn>,
    declared_paths: Vec<String>,
    scope: Vec<usize>,
    next_bit: usize,
    allow_unschematized: bool,
}

impl LayoutBuilder {
    pub fn new(name: impl Into<String>, schema_id: SchemaId) -> Self {
        Self {
            name: name.into(),
            schema_id,
            fixed: Vec::new(),
            variable: Vec::new(),
            sparse: Vec::new(),
            declared_paths: Vec::new(),
            scope: Vec::new(),
            next_bit: 0,
            allow_unschematized: true,
        }
    }

    pub fn allow_unschematized(&mut self, allow: bool) -> &mut Self {
        self.allow_unschematized = allow;
        self
    }

    fn full_path(&self, path: &str) -> String {
        match self.scope.last() {
            Some(&parent) => format!("{}.{}", self.sparse[parent].full_path, path),
            None => path.to_string(),
        }
    }

    fn take_bit(&mut self) -> usize {
        let bit = self.next_bit;
        self.next_bit += 1;
        bit
    }

    /// Adds a top-level fixed column. `length` is the byte width of utf8 and
    /// binary columns and is ignored for fixed-size types.
    pub fn add_fixed_column(
        &mut self,
        path: &str,
        layout_type: LayoutType,
        nullable: bool,
        length: usize,
    ) -> Result<()> {
        ensure!(
            self.scope.is_empty(),
            "fixed column '{}' cannot be nested inside a scope",
            path
        );
        let size = match layout_type.fixed_size() {
            Some(_) if layout_type == LayoutType::Null => {
                bail!("column '{}' cannot have fixed storage of type null", path)
            }
            Some(size) => size,
            None if layout_type.is_length_prefixed() => {
                ensure!(
                    length > 0,
                    "fixed {} column '{}' requires a positive length",
                    layout_type,
                    path
                );
                length
            }
            None => bail!("type {} cannot use fixed storage (column '{}')", layout_type, path),
        };

        let bit = if nullable { Some(self.take_bit()) } else { None };
        self.declared_paths.push(path.to_string());
        self.fixed.push(PendingColumn {
            path: path.to_string(),
            full_path: path.to_string(),
            type_arg: TypeArgument::new(layout_type),
            nullable,
            size,
            bit,
            parent: None,
        });
        Ok(())
    }

    /// Adds a top-level variable column. Every variable column gets a presence bit.
    pub fn add_variable_column(&mut self, path: &str, layout_type: LayoutType) -> Result<()> {
        ensure!(
            self.scope.is_empty(),
            "variable column '{}' cannot be nested inside a scope",
            path
        );
        ensure!(
            layout_type.is_variable(),
            "type {} cannot use variable storage (column '{}')",
            layout_type,
            path
        );

        let bit = Some(self.take_bit());
        self.declared_paths.push(path.to_string());
        self.variable.push(PendingColumn {
            path: path.to_string(),
            full_path: path.to_string(),
            type_arg: TypeArgument::new(layout_type),
            nullable: true,
            size: 0,
            bit,
            parent: None,
        });
        Ok(())
    }

    pub fn add_sparse_column(&mut self, path: &str, type_arg: TypeArgument) -> Result<()> {
        ensure!(
            type_arg.is_well_formed(),
            "malformed type {} for column '{}'",
            type_arg,
            path
        );
        let full_path = self.full_path(path);
        self.declared_paths.push(path.to_string());
        self.sparse.push(PendingColumn {
            path: path.to_string(),
            full_path,
            type_arg,
            nullable: true,
            size: 0,
            bit: None,
            parent: self.scope.last().copied(),
        });
        Ok(())
    }

    /// Adds a sparse object column and makes it the parent of subsequent columns.
    pub fn add_object_scope(&mut self, path: &str, type_arg: TypeArgument) -> Result<()> {
        ensure!(
            type_arg.layout_type == LayoutType::Object,
            "scope column '{}' must be an object, got {}",
            path,
            type_arg
        );
        self.add_sparse_column(path, type_arg)?;
        self.scope.push(self.sparse.len() - 1);
        Ok(())
    }

    pub fn end_object_scope(&mut self) -> Result<()> {
        ensure!(self.scope.pop().is_some(), "no open object scope to end");
        Ok(())
    }

    pub fn build(self) -> Result<Layout> {
        ensure!(
            self.scope.is_empty(),
            "layout '{}' has {} unterminated object scope(s)",
            self.name,
            self.scope.len()
        );

        let num_fixed = self.fixed.len();
        let num_variable = self.variable.len();
        let sparse_base = num_fixed + num_variable;
        let num_bitmask_bytes = self.next_bit.div_ceil(8);

        let mut columns = Vec::with_capacity(sparse_base + self.sparse.len());
        let mut offset = num_bitmask_bytes;
        for pending in self.fixed {
            let size = pending.size;
            columns.push(finish(pending, StorageKind::Fixed, offset, columns.len(), None));
            offset += size;
        }
        let slots_offset = offset;
        for (var_index, pending) in self.variable.into_iter().enumerate() {
            columns.push(finish(pending, StorageKind::Variable, var_index, columns.len(), None));
        }
        for pending in self.sparse {
            let parent = pending.parent.map(|p| sparse_base + p);
            columns.push(finish(pending, StorageKind::Sparse, 0, columns.len(), parent));
        }

        let mut path_index = HashMap::with_capacity(columns.len());
        for column in &columns {
            if path_index.insert(column.full_path.clone(), column.index).is_some() {
                bail!(
                    "duplicate column path '{}' in layout '{}'",
                    column.full_path,
                    self.name
                );
            }
        }

        let mut tokenizer = StringTokenizer::new();
        for path in &self.declared_paths {
            tokenizer.add(path);
        }

        let size = slots_offset + num_variable * VARIABLE_SLOT_SIZE;
        debug!(
            layout = %self.name,
            schema_id = %self.schema_id,
            fixed = num_fixed,
            variable = num_variable,
            sparse = columns.len() - sparse_base,
            size,
            "built layout"
        );

        Ok(Layout {
            schema_id: self.schema_id,
            name: self.name,
            columns,
            num_fixed,
            num_variable,
            num_bitmask_bytes,
            slots_offset,
            size,
            path_index,
            tokenizer,
            allow_unschematized: self.allow_unschematized,
        })
    }
}

fn finish(
    pending: PendingColumn,
    storage: StorageKind,
    offset: usize,
    index: usize,
    parent: Option<usize>,
) -> LayoutColumn {
    LayoutColumn {
        path: pending.path,
        full_path: pending.full_path,
        type_arg: pending.type_arg,
        storage,
        nullable: pending.nullable,
        null_bit: pending.bit.map(LayoutBit::new),
        offset,
        size: pending.size,
        index,
        parent,
    }
}
