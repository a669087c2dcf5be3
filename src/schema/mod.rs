//! # Logical Schema Model
//!
//! Plain data types describing the logical shape of rows. These are the input
//! of the layout compiler and nothing else: the row engine only ever consumes
//! the compiled [`Layout`](crate::layouts::Layout).
//!
//! ## Hierarchy
//!
//! ```text
//! Namespace
//! └── Schema (name, id, options)
//!     └── Property (path)
//!         └── PropertyType (kind, storage, nullable, ...)
//!             ├── items / keys / values   (collections, tuples, tagged)
//!             ├── properties              (nested objects)
//!             └── name / id               (UDT references)
//! ```
//!
//! ## JSON Form
//!
//! ```json
//! {
//!   "name": "Contacts",
//!   "schemas": [{
//!     "name": "Person", "id": 1,
//!     "properties": [
//!       { "path": "age",  "type": { "type": "int32", "storage": "fixed" } },
//!       { "path": "name", "type": { "type": "utf8", "storage": "variable" } },
//!       { "path": "tags", "type": { "type": "array", "items": { "type": "utf8", "nullable": false } } }
//!     ]
//!   }]
//! }
//! ```
//!
//! Validation (identifiers, duplicate paths, dangling references) happens in
//! the compiler, not at deserialization time.

pub mod namespace;
pub mod property;

pub use namespace::{Namespace, Schema, SchemaId, SchemaOptions};
pub use property::{ItemTypes, Property, PropertyType, StorageKind, TypeKind};
