//! # Norm Layer Factory
//!
//! Selects a normalization layer constructor by name:
//!
//! | name       | builder                                         |
//! |------------|-------------------------------------------------|
//! | `batch`    | [`BatchNorm`] without learnable affine params   |
//! | `instance` | [`InstanceNorm`] without learnable affine params|
//! | `spectral` | [`SpectralNorm`] wrapper of a weighted layer    |
//!
//! Batch norm still tracks running statistics; instance norm does not.
//!
//! [`BatchNorm`]: burn::nn::BatchNorm
//! [`InstanceNorm`]: burn::nn::InstanceNorm

use crate::compat::normalization_wrapper::{FeatureNormConfig, NormalizationConfig};
use crate::layers::norm::error::NormError;
use crate::layers::norm::spectral::{SpectralNorm, SpectralNormConfig};
use crate::layers::norm::targets::SpectralTarget;
use burn::config::Config;
use burn::nn::{BatchNormConfig, InstanceNormConfig};
use burn::prelude::Backend;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

const FEATURE_NORM: &str = "a feature norm layer";
const SPECTRAL_NORM: &str = "a spectral norm wrapper";

/// The normalization layer families selectable by name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    /// Batch normalization.
    Batch,

    /// Instance normalization; the default.
    #[default]
    Instance,

    /// Spectral normalization of a wrapped layer's weight.
    Spectral,
}

impl NormKind {
    /// The name this kind is selected by.
    pub fn name(&self) -> &'static str {
        match self {
            NormKind::Batch => "batch",
            NormKind::Instance => "instance",
            NormKind::Spectral => "spectral",
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormKind {
    type Err = NormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(NormKind::Batch),
            "instance" => Ok(NormKind::Instance),
            "spectral" => Ok(NormKind::Spectral),
            _ => Err(NormError::UnknownNormType(s.to_string())),
        }
    }
}

/// A selected normalization layer constructor.
///
/// Feature norms are sized at build time, via [`Self::feature_norm`];
/// spectral norm wraps an existing layer, via [`Self::wrap`].
#[derive(Config, Debug)]
pub enum NormLayerBuilder {
    /// A batch or instance norm.
    Feature(FeatureNormConfig),

    /// A spectral norm wrapper.
    Spectral(SpectralNormConfig),
}

impl From<FeatureNormConfig> for NormLayerBuilder {
    fn from(config: FeatureNormConfig) -> Self {
        Self::Feature(config)
    }
}

impl From<SpectralNormConfig> for NormLayerBuilder {
    fn from(config: SpectralNormConfig) -> Self {
        Self::Spectral(config)
    }
}

impl From<NormKind> for NormLayerBuilder {
    fn from(kind: NormKind) -> Self {
        match kind {
            NormKind::Batch => {
                FeatureNormConfig::new(NormalizationConfig::Batch(BatchNormConfig::new(0)))
                    .with_learnable_affine(false)
                    .into()
            }
            NormKind::Instance => {
                FeatureNormConfig::new(NormalizationConfig::Instance(InstanceNormConfig::new(0)))
                    .with_learnable_affine(false)
                    .into()
            }
            NormKind::Spectral => SpectralNormConfig::new().into(),
        }
    }
}

impl NormLayerBuilder {
    /// The norm family of this builder.
    pub fn kind(&self) -> NormKind {
        match self {
            NormLayerBuilder::Feature(config) => match config.norm {
                NormalizationConfig::Batch(_) => NormKind::Batch,
                NormalizationConfig::Instance(_) => NormKind::Instance,
            },
            NormLayerBuilder::Spectral(_) => NormKind::Spectral,
        }
    }

    /// Size the feature norm config for `num_features` channels.
    ///
    /// # Errors
    ///
    /// [`NormError::WrongNormKind`] for a spectral builder.
    pub fn feature_norm(
        &self,
        num_features: usize,
    ) -> Result<FeatureNormConfig, NormError> {
        match self {
            NormLayerBuilder::Feature(config) => Ok(config.clone().with_num_features(num_features)),
            NormLayerBuilder::Spectral(_) => Err(NormError::WrongNormKind {
                expected: FEATURE_NORM,
                found: NormKind::Spectral,
            }),
        }
    }

    /// The spectral norm config.
    ///
    /// # Errors
    ///
    /// [`NormError::WrongNormKind`] for a feature norm builder.
    pub fn spectral(&self) -> Result<&SpectralNormConfig, NormError> {
        match self {
            NormLayerBuilder::Spectral(config) => Ok(config),
            NormLayerBuilder::Feature(_) => Err(NormError::WrongNormKind {
                expected: SPECTRAL_NORM,
                found: self.kind(),
            }),
        }
    }

    /// Wrap `layer` in a [`SpectralNorm`].
    ///
    /// # Errors
    ///
    /// * [`NormError::WrongNormKind`] for a feature norm builder.
    /// * [`NormError::InvalidDim`] if the configured dim does not fit the layer.
    pub fn wrap<B: Backend, L: SpectralTarget<B>>(
        &self,
        layer: L,
        device: &B::Device,
    ) -> Result<SpectralNorm<B, L>, NormError> {
        self.spectral()?.init(layer, device)
    }
}

/// Return a normalization layer constructor by name.
///
/// Accepted names are `batch`, `instance` and `spectral`.
///
/// # Errors
///
/// [`NormError::UnknownNormType`] for any other name.
pub fn build_norm_layer(norm_type: &str) -> Result<NormLayerBuilder, NormError> {
    let kind: NormKind = norm_type.parse()?;
    tracing::debug!(%kind, "selected normalization layer");
    Ok(kind.into())
}
