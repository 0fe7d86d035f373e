//! Miscellaneous blocks.
pub mod cna;
