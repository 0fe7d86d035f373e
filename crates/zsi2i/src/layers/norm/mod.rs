//! # Normalization Layers
//!
//! * [`spectral`] - spectral normalization of weighted layers.
//! * [`factory`] - select a norm layer constructor by name.
pub mod error;
pub mod factory;
pub mod spectral;
pub mod targets;

pub use error::NormError;
pub use factory::{NormKind, NormLayerBuilder, build_norm_layer};
pub use spectral::{SpectralNorm, SpectralNormConfig};
pub use targets::SpectralTarget;
