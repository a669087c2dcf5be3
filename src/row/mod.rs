//! # Row Engine
//!
//! Reading and writing HybridRow encoded rows.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `header` | 5-byte version + schema id prefix |
//! | `buffer` | `RowBuffer`: owned bytes, growth, fixed and variable columns |
//! | `sparse` | self-describing sparse fields and scope bodies |
//! | `cursor` | `RowCursor`: a position within one scope |
//! | `reader` | `RowReader`: forward enumeration with typed accessors |
//! | `writer` | `RowWriter`: path-addressed writes and nested scopes |
//! | `value` | `RowValue` and the non-native primitive types |
//! | `resizer` | growth policies |
//! | `result` | `RowError` codes and `UpdateOptions` |
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = Arc::new(NamespaceResolver::new(namespace));
//! let layout = resolver.layout_by_name("Person")?;
//!
//! let mut row = RowBuffer::new(resolver.clone());
//! row.init_layout(HYBRID_ROW_VERSION_V1, layout)?;
//! RowWriter::write_buffer(&mut row, |w| w.write_utf8("name", "ada"))?;
//!
//! let mut reader = RowReader::new(&row)?;
//! while reader.read()? {
//!     println!("{:?}: {:?}", reader.path()?, reader.read_value()?);
//! }
//! ```
//!
//! ## Errors
//!
//! Row operations return `RowResult<T>` with a `Copy` error code rather than
//! an `eyre::Report`: failed lookups (`NotFound`) are ordinary control flow
//! on the read path. Schema compilation and configuration use `eyre`.

mod buffer;
mod cursor;
mod header;
mod reader;
mod resizer;
mod result;
mod sparse;
mod value;
mod writer;

#[cfg(test)]
mod tests;

pub use buffer::{RowBuffer, RowBufferBuilder};
pub use cursor::{RowCursor, SparsePath};
pub use header::RowHeader;
pub use reader::{Checkpoint, ReaderState, RowReader};
pub use resizer::{BoundedResizer, BufferResizer, DefaultResizer};
pub use result::{RowError, RowResult, UpdateOptions};
pub use sparse::KEYED_SCOPE_END;
pub use value::{DateTime, Decimal, Float128, Guid, MongoDbObjectId, RowValue, UnixDateTime};
pub use writer::RowWriter;
