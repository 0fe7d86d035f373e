//! # Normalization Wrapper
//!
//! Provides support for the feature norm layers used by image translation GANs:
//! * [`Batch`] - [`BatchNorm`]
//! * [`Instance`] - [`InstanceNorm`]
//!
//! [`FeatureNormConfig`] adds control over the learnable affine transform,
//! which the GAN generators and discriminators disable.
//!
//! The enums are non-exhaustive, to prepare for future additions.

use burn::nn::{BatchNorm, BatchNormConfig, InstanceNorm, InstanceNormConfig};
use burn::prelude::{Backend, Config, Module, Tensor};

/// ['Normalization'] Configuration.
#[derive(Config, Debug)]
#[non_exhaustive]
pub enum NormalizationConfig {
    /// ['`BatchNorm`'] Configuration.
    Batch(BatchNormConfig),

    /// ['`InstanceNorm`'] Configuration.
    Instance(InstanceNormConfig),
}

impl From<BatchNormConfig> for NormalizationConfig {
    fn from(config: BatchNormConfig) -> Self {
        Self::Batch(config)
    }
}

impl From<InstanceNormConfig> for NormalizationConfig {
    fn from(config: InstanceNormConfig) -> Self {
        Self::Instance(config)
    }
}

impl NormalizationConfig {
    /// Initialize a ['Normalization'] layer.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Normalization<B> {
        match self {
            NormalizationConfig::Batch(config) => config.init(device).into(),
            NormalizationConfig::Instance(config) => config.init(device).into(),
        }
    }

    /// Adjust a norm config to the feature size.
    pub fn with_num_features(
        self,
        num_features: usize,
    ) -> Self {
        match self {
            NormalizationConfig::Batch(config) => BatchNormConfig {
                num_features,
                ..config
            }
            .into(),
            NormalizationConfig::Instance(config) => InstanceNormConfig {
                num_channels: num_features,
                ..config
            }
            .into(),
        }
    }

    /// Get the number of features.
    pub fn num_features(&self) -> usize {
        match self {
            NormalizationConfig::Batch(config) => config.num_features,
            NormalizationConfig::Instance(config) => config.num_channels,
        }
    }
}

/// [`FeatureNormConfig`] pairs a [`NormalizationConfig`] with its affine policy.
#[derive(Config, Debug)]
pub struct FeatureNormConfig {
    /// The wrapped norm config.
    pub norm: NormalizationConfig,

    /// Whether the per-channel scale and shift are trained.
    ///
    /// When `false`:
    /// * batch norm keeps its unit scale and zero shift frozen,
    ///   but still tracks running statistics;
    /// * instance norm is built without affine parameters.
    #[config(default = true)]
    pub learnable_affine: bool,
}

impl FeatureNormConfig {
    /// Adjust the wrapped norm config to the feature size.
    pub fn with_num_features(
        self,
        num_features: usize,
    ) -> Self {
        Self {
            norm: self.norm.with_num_features(num_features),
            ..self
        }
    }

    /// Get the number of features.
    pub fn num_features(&self) -> usize {
        self.norm.num_features()
    }

    /// Initialize a ['Normalization'] layer.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Normalization<B> {
        if self.learnable_affine {
            return self.norm.init(device);
        }
        match &self.norm {
            NormalizationConfig::Batch(config) => {
                Normalization::Batch(config.init(device).no_grad())
            }
            NormalizationConfig::Instance(config) => {
                config.clone().with_affine(false).init(device).into()
            }
        }
    }
}

/// Normalization Layer Wrapper
///
/// Provides support for built-in ``burn::nn::norm`` norm layers:
/// * [`Batch`] - [`BatchNorm`]
/// * [`Instance`] - [`InstanceNorm`]
///
/// The enum is non-exhaustive, to prepare for future additions.
#[derive(Module, Debug)]
#[non_exhaustive]
pub enum Normalization<B: Backend> {
    /// [`BatchNorm`] layer; restricted to `BatchNorm`<2>.
    Batch(BatchNorm<B, 2>),

    /// ['`InstanceNorm`'] layer.
    Instance(InstanceNorm<B>),
}

impl<B: Backend> From<BatchNorm<B, 2>> for Normalization<B> {
    fn from(layer: BatchNorm<B, 2>) -> Self {
        Self::Batch(layer)
    }
}

impl<B: Backend> From<InstanceNorm<B>> for Normalization<B> {
    fn from(layer: InstanceNorm<B>) -> Self {
        Self::Instance(layer)
    }
}

impl<B: Backend> Normalization<B> {
    /// Applies normalization to a tensor.
    ///
    /// Both layers expect ``[batch, channels, height, width]``;
    /// and produce an output of the same shape.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Normalization::Batch(norm) => norm.forward(input),
            Normalization::Instance(norm) => norm.forward(input),
        }
    }

    /// Get the number of features.
    pub fn num_features(&self) -> usize {
        match self {
            Normalization::Batch(norm) => norm.gamma.shape().dims[0],
            Normalization::Instance(norm) => norm.num_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type B = Autodiff<NdArray<f32>>;

    #[test]
    fn test_batch_norm() {
        let device = Default::default();

        let num_features = 12;
        let input: Tensor<B, 4> = Tensor::ones([2, num_features, 3, 4], &device);

        let config: NormalizationConfig = BatchNormConfig::new(12).into();

        let layer: Normalization<B> = config.init(&device);
        assert_eq!(layer.num_features(), num_features);

        let expected = match &layer {
            Normalization::Batch(inner) => inner.forward(input.clone()),
            _ => panic!("Unexpected layer type"),
        };

        let output = layer.forward(input);

        output.to_data().assert_eq(&expected.to_data(), true);
    }

    #[test]
    fn test_instance_norm() {
        let device = Default::default();

        let num_features = 12;
        let input: Tensor<B, 4> = Tensor::ones([2, num_features, 3, 4], &device);

        let config: NormalizationConfig = InstanceNormConfig::new(num_features).into();

        let layer: Normalization<B> = config.init(&device);
        assert_eq!(layer.num_features(), num_features);

        let expected = match &layer {
            Normalization::Instance(inner) => inner.forward(input.clone()),
            _ => panic!("Unexpected layer type"),
        };

        let output = layer.forward(input);

        output.to_data().assert_eq(&expected.to_data(), true);
    }

    #[test]
    fn test_with_num_features() {
        let config: NormalizationConfig = BatchNormConfig::new(0).into();
        assert_eq!(config.with_num_features(7).num_features(), 7);

        let config = FeatureNormConfig::new(InstanceNormConfig::new(0).into());
        assert_eq!(config.with_num_features(5).num_features(), 5);
    }

    #[test]
    fn test_frozen_batch_affine() {
        let device = Default::default();

        let layer: Normalization<B> =
            FeatureNormConfig::new(BatchNormConfig::new(3).into())
                .with_learnable_affine(false)
                .init(&device);

        match &layer {
            Normalization::Batch(inner) => {
                assert!(!inner.gamma.val().is_require_grad());
                assert!(!inner.beta.val().is_require_grad());
            }
            _ => panic!("Unexpected layer type"),
        };

        let learnable: Normalization<B> =
            FeatureNormConfig::new(BatchNormConfig::new(3).into()).init(&device);
        match &learnable {
            Normalization::Batch(inner) => assert!(inner.gamma.val().is_require_grad()),
            _ => panic!("Unexpected layer type"),
        };
    }

    #[test]
    fn test_instance_without_affine() {
        let device = Default::default();
        let num_features = 4;

        let layer: Normalization<B> =
            FeatureNormConfig::new(InstanceNormConfig::new(num_features).into())
                .with_learnable_affine(false)
                .init(&device);

        let reference = InstanceNormConfig::new(num_features)
            .with_affine(false)
            .init::<B>(&device);

        let input: Tensor<B, 4> =
            Tensor::random([2, num_features, 3, 3], Distribution::Default, &device);

        layer
            .forward(input.clone())
            .to_data()
            .assert_eq(&reference.forward(input).to_data(), true);
    }
}
