//! # Internal Macros
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types.
//!
//! ```ignore
//! use zerocopy::little_endian::I32;
//!
//! #[repr(C)]
//! struct RowHeader {
//!     version: u8,
//!     schema_id: I32,
//! }
//!
//! impl RowHeader {
//!     zerocopy_accessors! {
//!         version: u8,
//!         schema_id: i32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn version(&self) -> u8 { self.version }
//! // pub fn set_version(&mut self, val: u8) { self.version = val; }
//! // pub fn schema_id(&self) -> i32 { self.schema_id.get() }
//! // pub fn set_schema_id(&mut self, val: i32) { self.schema_id = I32::new(val); }
//! ```
//!
//! ## typed_readers! / typed_writers!
//!
//! Expand a table of `name => RowValue variant : Rust type` into the typed
//! `read_<name>` / `write_<name>` methods of `RowReader` and `RowWriter`. The
//! readers require an exact variant match (`TypeMismatch` otherwise); the
//! writers forward to `write_value`.

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u8) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u8 {
                self.$field
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u8) {
                self.$field = val;
            }
        }
    };
    (@impl $field:ident, i32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> i32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: i32) {
                self.$field = ::zerocopy::little_endian::I32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}

/// Generates `read_<name>` accessors that match one `RowValue` variant.
#[macro_export]
macro_rules! typed_readers {
    ($($name:ident => $variant:ident : $ty:ty),* $(,)?) => {
        ::paste::paste! {
            $(
                #[inline]
                pub fn [<read_ $name>](&self) -> $crate::row::RowResult<$ty> {
                    match self.read_value()? {
                        $crate::row::RowValue::$variant(v) => Ok(v),
                        _ => Err($crate::row::RowError::TypeMismatch),
                    }
                }
            )*
        }
    };
}

/// Generates `write_<name>(path, value)` methods that forward to `write_value`.
#[macro_export]
macro_rules! typed_writers {
    ($($name:ident => $variant:ident : $ty:ty),* $(,)?) => {
        ::paste::paste! {
            $(
                #[inline]
                pub fn [<write_ $name>](&mut self, path: &str, value: $ty) -> $crate::row::RowResult<()> {
                    self.write_value(path, $crate::row::RowValue::$variant(value))
                }
            )*
        }
    };
}
