//! # Normalization Errors

use crate::layers::norm::factory::NormKind;

/// Errors raised while selecting or constructing normalization layers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormError {
    /// The requested normalization name has no registered layer.
    #[error("normalization layer [{0}] is not found")]
    UnknownNormType(String),

    /// A builder of one norm family was asked for another family's product.
    #[error("{found} normalization does not provide {expected}")]
    WrongNormKind {
        /// The product the caller asked for.
        expected: &'static str,
        /// The family the builder actually holds.
        found: NormKind,
    },

    /// The spectral axis is out of range for the wrapped weight.
    #[error("spectral norm dim {dim} is out of range for a weight of rank {rank}")]
    InvalidDim {
        /// The requested axis.
        dim: usize,
        /// The rank of the wrapped layer's weight.
        rank: usize,
    },
}
