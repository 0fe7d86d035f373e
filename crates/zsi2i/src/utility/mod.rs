//! Miscellaneous utilities.
pub mod burn;
