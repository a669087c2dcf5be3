//! # Buffer Growth Policies
//!
//! `RowBuffer` asks its resizer for a new capacity whenever a write would
//! overflow the current allocation. The call happens synchronously at the
//! write site, before any bytes move.

use crate::config::{DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_CAPACITY, MAX_ROW_SIZE};
use crate::row::{RowError, RowResult};

pub trait BufferResizer: Send + Sync + std::fmt::Debug {
    /// Returns a capacity of at least `required` bytes, or `TooBig`.
    fn grow(&self, current: usize, required: usize) -> RowResult<usize>;

    /// Largest row this policy permits.
    fn max_size(&self) -> usize {
        MAX_ROW_SIZE
    }
}

/// Geometric growth by `growth_factor`, never below the default initial capacity.
#[derive(Debug, Clone, Copy)]
pub struct DefaultResizer {
    growth_factor: usize,
}

impl Default for DefaultResizer {
    fn default() -> Self {
        Self {
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

impl DefaultResizer {
    pub fn with_growth_factor(growth_factor: usize) -> Self {
        Self {
            growth_factor: growth_factor.max(2),
        }
    }
}

impl BufferResizer for DefaultResizer {
    fn grow(&self, current: usize, required: usize) -> RowResult<usize> {
        if required > MAX_ROW_SIZE {
            return Err(RowError::TooBig);
        }
        let geometric = current.saturating_mul(self.growth_factor);
        Ok(required
            .max(geometric)
            .max(DEFAULT_INITIAL_CAPACITY)
            .min(MAX_ROW_SIZE))
    }
}

/// Doubling growth capped at a hard maximum row size.
#[derive(Debug, Clone, Copy)]
pub struct BoundedResizer {
    max_size: usize,
}

impl BoundedResizer {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.min(MAX_ROW_SIZE),
        }
    }
}

impl BufferResizer for BoundedResizer {
    fn grow(&self, current: usize, required: usize) -> RowResult<usize> {
        if required > self.max_size {
            return Err(RowError::TooBig);
        }
        Ok(required.max(current.saturating_mul(2)).min(self.max_size))
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}
