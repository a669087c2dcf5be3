//! # HybridRow - Schematized and Sparse Binary Rows
//!
//! HybridRow is a binary row format that mixes two storage disciplines in one
//! buffer:
//!
//! - **Schematized columns**: declared by a schema, stored at offsets fixed by
//!   a compiled layout. No per-value metadata.
//! - **Sparse fields**: self-describing path/type/value records for anything
//!   the schema leaves open, including nested objects, arrays, typed
//!   collections, tuples and embedded rows of other schemas (UDTs).
//!
//! ## Quick Start
//!
//! ```ignore
//! use hybridrow::{Namespace, NamespaceResolver, RowBuffer, RowReader, RowWriter};
//! use hybridrow::config::HYBRID_ROW_VERSION_V1;
//!
//! let namespace = Namespace::from_json(SCHEMA_JSON)?;
//! let resolver = Arc::new(NamespaceResolver::new(namespace));
//! let layout = resolver.layout_by_name("Person")?;
//!
//! let mut row = RowBuffer::new(resolver.clone());
//! row.init_layout(HYBRID_ROW_VERSION_V1, layout)?;
//! RowWriter::write_buffer(&mut row, |w| {
//!     w.write_int32("age", 36)?;
//!     w.write_utf8("nickname", "ada")
//! })?;
//!
//! let mut reader = RowReader::new(&row)?;
//! while reader.read()? {
//!     println!("{:?} = {:?}", reader.path()?, reader.read_value()?);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Schema model (Namespace/Schema)   │
//! ├─────────────────────────────────────┤
//! │  Layout compiler  │  Layout resolver │
//! ├─────────────────────────────────────┤
//! │   RowReader / RowWriter (paths)     │
//! ├─────────────────────────────────────┤
//! │   RowCursor (positions in scopes)   │
//! ├─────────────────────────────────────┤
//! │   RowBuffer (bytes, growth, codecs) │
//! ├─────────────────────────────────────┤
//! │   Varint / little-endian encoding   │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Row Layout
//!
//! ```text
//! [version 0x81][schema id i32]
//! [null bitmap][fixed columns][variable slots]   fixed segment
//! [variable payloads]                            variable segment
//! [sparse fields ...][0][EndScope]               sparse segment
//! ```
//!
//! ## Module Overview
//!
//! - [`schema`]: logical schema model, JSON (de)serialization
//! - [`layouts`]: physical types, layouts, compiler, resolvers
//! - [`row`]: buffer, cursor, reader and writer
//! - [`encoding`]: varint and zigzag primitives
//! - [`config`]: format constants

#[macro_use]
mod macros;

pub mod config;
pub mod encoding;
pub mod layouts;
pub mod row;
pub mod schema;

pub use layouts::{
    Layout, LayoutBuilder, LayoutCompiler, LayoutResolver, LayoutType, NamespaceResolver,
    StaticResolver, TypeArgument, TypeArgumentList,
};
pub use row::{
    RowBuffer, RowBufferBuilder, RowCursor, RowError, RowReader, RowResult, RowValue, RowWriter,
    UpdateOptions,
};
pub use schema::{Namespace, Property, PropertyType, Schema, SchemaId, StorageKind, TypeKind};
