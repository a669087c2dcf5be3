//! # Layouts
//!
//! The physical side of the schema: everything the row engine needs to know
//! about where a value lives and how it is typed.
//!
//! ```text
//! Namespace + Schema ──LayoutCompiler──> Layout ──Arc──> LayoutResolver ──> RowBuffer
//!                                          │
//!                                          ├── LayoutColumn (fixed | variable | sparse)
//!                                          └── StringTokenizer (path -> token)
//! ```
//!
//! ## Modules
//!
//! - `layout_code`: one-byte wire codes
//! - `layout_type`: `LayoutType`, `TypeArgument`, type-argument wire codec
//! - `layout`: compiled `Layout` and `LayoutColumn`
//! - `tokenizer`: path token table
//! - `builder`: position assignment for columns
//! - `compiler`: logical to physical schema compilation
//! - `resolver`: `SchemaId` to `Layout` lookup

pub mod builder;
pub mod compiler;
pub mod layout;
pub mod layout_code;
pub mod layout_type;
pub mod resolver;
pub mod tokenizer;

pub use builder::LayoutBuilder;
pub use compiler::LayoutCompiler;
pub use layout::{Layout, LayoutBit, LayoutColumn};
pub use layout_code::LayoutCode;
pub use layout_type::{LayoutType, MetaBytes, TypeArgument, TypeArgumentList};
pub use resolver::{LayoutResolver, NamespaceResolver, StaticResolver};
pub use tokenizer::StringTokenizer;
