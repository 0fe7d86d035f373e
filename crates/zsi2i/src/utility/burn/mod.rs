//! Utilities for working with ``burn`` types.
pub mod record;
