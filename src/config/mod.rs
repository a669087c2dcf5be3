//! # HybridRow Configuration Module
//!
//! Centralizes the wire-format widths, buffer sizing defaults and structural
//! limits used across the crate. Interdependent values are documented and
//! checked with compile-time assertions in [`constants`].

pub mod constants;
pub use constants::*;
