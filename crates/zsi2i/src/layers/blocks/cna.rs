//! # `CNA2d` - conv/norm/activation block.
//!
//! A [`CNA2d`] module is:
//! * a [`Conv2d`] layer, optionally spectrally normalized,
//! * a [`Normalization`] layer, unless the conv is spectrally normalized,
//! * a [`Activation`] layer.
//!
//! The norm is chosen by a [`NormLayerBuilder`], usually from
//! [`build_norm_layer`](crate::layers::norm::build_norm_layer).

use crate::compat::activation_wrapper::{Activation, ActivationConfig};
use crate::compat::normalization_wrapper::Normalization;
use crate::layers::norm::{NormError, NormLayerBuilder, SpectralNorm};
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Tensor};

/// Abstract policy for [`CNA2d`] Config.
///
/// Defines a [`NormLayerBuilder`] and [`ActivationConfig`],
/// and can be lifted to a [`CNA2dConfig`] to match a [`Conv2dConfig`].
#[derive(Config, Debug)]
pub struct AbstractCNA2dConfig {
    /// The norm layer builder.
    pub norm: NormLayerBuilder,

    /// Activation Config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl AbstractCNA2dConfig {
    /// Merge with a [`Conv2dConfig`] to construct a [`CNA2dConfig`].
    pub fn build_config(
        &self,
        conv: Conv2dConfig,
    ) -> CNA2dConfig {
        CNA2dConfig {
            conv,
            norm: self.norm.clone(),
            act: self.act.clone(),
        }
    }
}

/// [`CNA2d`] Meta.
pub trait CNA2dMeta {
    /// Number of input channels.
    fn in_channels(&self) -> usize;

    /// Number of groups.
    fn groups(&self) -> usize;

    /// Number of output channels.
    fn out_channels(&self) -> usize;

    /// Get the stride.
    fn stride(&self) -> [usize; 2];
}

/// [`CNA2d`] Config.
///
/// Implements [`CNA2dMeta`].
#[derive(Config, Debug)]
pub struct CNA2dConfig {
    /// The [`Conv2d`] config.
    pub conv: Conv2dConfig,

    /// The norm layer builder.
    pub norm: NormLayerBuilder,

    /// The [`Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl CNA2dMeta for CNA2dConfig {
    fn in_channels(&self) -> usize {
        self.conv.channels[0]
    }

    fn groups(&self) -> usize {
        self.conv.groups
    }

    fn out_channels(&self) -> usize {
        self.conv.channels[1]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.stride
    }
}

impl CNA2dConfig {
    /// Initialize a [`CNA2d`].
    ///
    /// Feature norms are sized to the conv layer's output channels;
    /// a spectral norm builder wraps the conv layer instead.
    ///
    /// # Errors
    ///
    /// Propagates [`NormError`]s from the norm builder.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> Result<CNA2d<B>, NormError> {
        let conv: Conv2d<B> = self.conv.init(device);

        let (conv, norm) = match &self.norm {
            NormLayerBuilder::Spectral(_) => {
                (NormedConv2d::Spectral(self.norm.wrap(conv, device)?), None)
            }
            NormLayerBuilder::Feature(_) => {
                let norm = self.norm.feature_norm(self.out_channels())?.init(device);
                (NormedConv2d::Plain(conv), Some(norm))
            }
        };

        Ok(CNA2d {
            conv,
            norm,
            act: self.act.init(device),
        })
    }
}

/// A [`Conv2d`] layer, either plain or spectrally normalized.
#[derive(Module, Debug)]
pub enum NormedConv2d<B: Backend> {
    /// Plain conv layer.
    Plain(Conv2d<B>),

    /// Spectrally normalized conv layer.
    Spectral(SpectralNorm<B, Conv2d<B>>),
}

impl<B: Backend> NormedConv2d<B> {
    /// The raw conv layer.
    pub fn raw(&self) -> &Conv2d<B> {
        match self {
            NormedConv2d::Plain(conv) => conv,
            NormedConv2d::Spectral(sn) => &sn.layer,
        }
    }

    /// Forward pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            NormedConv2d::Plain(conv) => conv.forward(input),
            NormedConv2d::Spectral(sn) => sn.forward(input),
        }
    }
}

/// Sequenced conv/norm/activation block.
///
/// Implements [`CNA2dMeta`].
#[derive(Module, Debug)]
pub struct CNA2d<B: Backend> {
    /// Internal conv layer.
    pub conv: NormedConv2d<B>,

    /// Internal norm layer; absent for spectral norm.
    pub norm: Option<Normalization<B>>,

    /// Activation layer.
    pub act: Activation<B>,
}

impl<B: Backend> CNA2dMeta for CNA2d<B> {
    fn in_channels(&self) -> usize {
        self.conv.raw().weight.shape().dims[1] * self.groups()
    }

    fn groups(&self) -> usize {
        self.conv.raw().groups
    }

    fn out_channels(&self) -> usize {
        self.conv.raw().weight.shape().dims[0]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.raw().stride
    }
}

impl<B: Backend> CNA2d<B> {
    /// Forward Pass.
    ///
    /// Applies the conv/norm/act layers in sequence:
    ///
    /// ```rust,ignore
    /// let x = self.conv.forward(input);
    /// let x = self.norm.forward(x);
    /// let x = self.act.forward(x);
    /// return x
    /// ```
    ///
    /// # Arguments
    ///
    /// - `input`: \
    ///   ``[batch, in_channels, in_height=out_height*stride, in_width=out_width*stride]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, out_height, out_width]``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.hook_forward(input, |x| x)
    }

    /// Hooked Forward Pass.
    ///
    /// Applies the hook after normalization but before activation.
    ///
    /// # Arguments
    ///
    /// - `input`: \
    ///   ``[batch, in_channels, in_height=out_height*stride, in_width=out_width*stride]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, out_height, out_width]``
    pub fn hook_forward<F>(
        &self,
        input: Tensor<B, 4>,
        hook: F,
    ) -> Tensor<B, 4>
    where
        F: FnOnce(Tensor<B, 4>) -> Tensor<B, 4>,
    {
        static INPUT_CONTRACT: ShapeContract = shape_contract![
            "batch",
            "in_channels",
            "in_height" = "out_height" * "height_stride",
            "in_width" = "out_width" * "width_stride"
        ];
        let [batch, out_height, out_width] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch", "out_height", "out_width"],
            &[
                ("in_channels", self.in_channels()),
                ("height_stride", self.stride()[0]),
                ("width_stride", self.stride()[1]),
            ],
        );
        let x = self.conv.forward(input);

        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };

        let x = hook(x);

        let x = self.act.forward(x);

        run_every_nth!({
            static OUTPUT_CONTRACT: ShapeContract =
                shape_contract!["batch", "out_channels", "out_height", "out_width"];
            OUTPUT_CONTRACT.assert_shape(
                &x,
                &[
                    ("batch", batch),
                    ("out_channels", self.out_channels()),
                    ("out_height", out_height),
                    ("out_width", out_width),
                ],
            );
        });

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::norm::{NormKind, build_norm_layer};
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::PaddingConfig2d;
    use burn::tensor::Distribution;

    type B = Autodiff<NdArray<f32>>;

    fn down_conv() -> Conv2dConfig {
        Conv2dConfig::new([2, 4], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
    }

    #[test]
    fn test_cna_config() {
        let abstract_config =
            AbstractCNA2dConfig::new(build_norm_layer("instance").unwrap())
                .with_act(ActivationConfig::gan_leaky_relu());

        let config: CNA2dConfig = abstract_config.build_config(down_conv());

        assert_eq!(config.in_channels(), 2);
        assert_eq!(config.out_channels(), 4);
        assert_eq!(config.groups(), 1);
        assert_eq!(config.stride(), [2, 2]);
        assert_eq!(config.norm.kind(), NormKind::Instance);
    }

    #[test]
    fn test_cna_feature_norm() {
        let device = Default::default();

        let layer: CNA2d<B> = CNA2dConfig::new(down_conv(), build_norm_layer("batch").unwrap())
            .init(&device)
            .unwrap();
        assert_eq!(layer.in_channels(), 2);
        assert_eq!(layer.out_channels(), 4);
        assert!(matches!(layer.conv, NormedConv2d::Plain(_)));
        assert_eq!(layer.norm.as_ref().unwrap().num_features(), 4);

        let input = Tensor::random([2, 2, 8, 8], Distribution::Default, &device);

        let output = layer.forward(input.clone());
        assert_eq!(output.dims(), [2, 4, 4, 4]);

        let hook = |x| x * 2.0;
        let output = layer.hook_forward(input.clone(), hook);
        let expected = {
            let x = layer.conv.forward(input);
            let x = layer.norm.as_ref().unwrap().forward(x);
            let x = hook(x);
            layer.act.forward(x)
        };
        output.to_data().assert_eq(&expected.to_data(), true);
    }

    #[test]
    fn test_cna_spectral_norm() {
        let device = Default::default();

        let layer: CNA2d<B> =
            CNA2dConfig::new(down_conv(), build_norm_layer("spectral").unwrap())
                .with_act(ActivationConfig::gan_leaky_relu())
                .init(&device)
                .unwrap();
        assert!(layer.norm.is_none());
        match &layer.conv {
            NormedConv2d::Spectral(sn) => assert_eq!(sn.dim(), 1),
            _ => panic!("Unexpected conv type"),
        }
        assert_eq!(layer.in_channels(), 2);
        assert_eq!(layer.out_channels(), 4);

        let input = Tensor::random([1, 2, 8, 8], Distribution::Default, &device);
        let output = layer.forward(input);
        assert_eq!(output.dims(), [1, 4, 4, 4]);
    }

    #[test]
    #[should_panic]
    fn test_cna_rejects_unstrided_input() {
        let device = Default::default();

        let layer: CNA2d<B> = CNA2dConfig::new(down_conv(), build_norm_layer("instance").unwrap())
            .init(&device)
            .unwrap();

        // 7 is not a multiple of the stride.
        let input = Tensor::random([1, 2, 7, 7], Distribution::Default, &device);
        let _ = layer.forward(input);
    }

    #[test]
    #[should_panic]
    fn test_cna_rejects_wrong_channels() {
        let device = Default::default();

        let layer: CNA2d<B> = CNA2dConfig::new(down_conv(), build_norm_layer("spectral").unwrap())
            .init(&device)
            .unwrap();

        let input = Tensor::random([1, 3, 8, 8], Distribution::Default, &device);
        let _ = layer.forward(input);
    }
}
