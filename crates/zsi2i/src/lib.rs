#![warn(missing_docs)]
//!# zsi2i - Normalization layers for zero-shot image-to-image translation GANs
//!
//! ## Notable Components
//!
//! * [`compat`] - wrappers over built-in ``burn::nn`` layers.
//!   * [`compat::activation_wrapper::Activation`] - activation layer abstraction wrapper.
//!   * [`compat::normalization_wrapper::Normalization`] - feature norm layer abstraction wrapper.
//! * [`layers`] - reusable neural network modules.
//!   * [`layers::norm`] - normalization layers.
//!     * [`layers::norm::spectral`] - spectral normalization of weighted layers.
//!     * [`layers::norm::factory`] - [`layers::norm::build_norm_layer`], norm selection by name.
//!   * [`layers::blocks`] - miscellaneous blocks.
//!     * [`layers::blocks::cna`] - ``Conv2d + Norm + Activation`` block.
//! * [`utility`] - record inspection helpers.

/// Test-only macro import.
#[cfg(test)]
#[allow(unused_imports)]
#[macro_use]
extern crate hamcrest;

pub mod compat;
pub mod layers;
pub mod utility;
