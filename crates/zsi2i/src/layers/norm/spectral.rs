//! # Spectral Normalization
//!
//! [`SpectralNorm`] wraps a weighted layer (see [`SpectralTarget`]) and
//! rescales its weight by an estimate of the weight's largest singular value
//! before every forward pass.
//!
//! The estimate is refined by power iteration, which only runs while training
//! (on an autodiff backend); the refined vectors are kept as running state,
//! so inference reuses the last training estimate without iterating.
//!
//! Persisting `u` and `v` follows `torch.nn.utils.spectral_norm`. Paddle's
//! `spectral_norm` operator iterates on copies and leaves its `U`/`V` inputs
//! unchanged, so each of its calls starts from the initial vectors.
//!
//! # Reference
//!
//! - [Spectral Normalization for Generative Adversarial Networks](https://arxiv.org/abs/1802.05957)

use crate::layers::norm::error::NormError;
use crate::layers::norm::targets::SpectralTarget;
use burn::config::Config;
use burn::module::{Module, RunningState};
use burn::nn::Linear;
use burn::nn::conv::{Conv1d, Conv2d, Conv3d, ConvTranspose1d, ConvTranspose2d, ConvTranspose3d};
use burn::prelude::{Backend, Tensor};
use burn::tensor::Distribution;

/// [`SpectralNorm`] Config.
#[derive(Config, Debug)]
pub struct SpectralNormConfig {
    /// The weight axis used as the rows of the normalized matrix.
    ///
    /// When `None`, the wrapped layer's [`SpectralTarget::DEFAULT_DIM`] is used.
    #[config(default = "None")]
    pub dim: Option<usize>,

    /// Power iterations per training forward pass.
    #[config(default = 1)]
    pub power_iters: usize,

    /// Numerical stability term for the l2 normalization.
    #[config(default = 1e-12)]
    pub eps: f64,
}

impl SpectralNormConfig {
    /// Wrap `layer` in a [`SpectralNorm`].
    ///
    /// On a backend without autodiff, the stored power iteration count is 0.
    ///
    /// # Errors
    ///
    /// [`NormError::InvalidDim`] if the resolved dim is not an axis of the layer weight.
    pub fn init<B: Backend, L: SpectralTarget<B>>(
        &self,
        layer: L,
        device: &B::Device,
    ) -> Result<SpectralNorm<B, L>, NormError> {
        let weight_dims = layer.weight_dims();
        let rank = weight_dims.len();
        let dim = self.dim.unwrap_or(L::DEFAULT_DIM);
        if dim >= rank {
            return Err(NormError::InvalidDim { dim, rank });
        }

        let power_iters = if B::ad_enabled() { self.power_iters } else { 0 };

        let rows = weight_dims[dim];
        let cols = weight_dims.iter().product::<usize>() / rows;

        let u = l2_normalize(
            Tensor::random([rows], Distribution::Normal(0.0, 1.0), device),
            self.eps,
        );
        let v = l2_normalize(
            Tensor::random([cols], Distribution::Normal(0.0, 1.0), device),
            self.eps,
        );

        tracing::debug!(dim, rows, cols, power_iters, "spectral norm wrapper created");

        Ok(SpectralNorm {
            layer,
            u: RunningState::new(u),
            v: RunningState::new(v),
            dim,
            power_iters,
            eps: self.eps,
        })
    }
}

/// Spectral Normalization wrapper.
///
/// `layer` holds the raw (un-normalized) weight, which is the trained parameter.
/// `u` and `v` are the left/right singular vector estimates, never trained.
#[derive(Module, Debug)]
pub struct SpectralNorm<B: Backend, L> {
    /// The wrapped layer.
    pub layer: L,

    /// Left singular vector estimate; ``[weight.dims[dim]]``.
    pub u: RunningState<Tensor<B, 1>>,

    /// Right singular vector estimate; ``[numel / weight.dims[dim]]``.
    pub v: RunningState<Tensor<B, 1>>,

    dim: usize,
    power_iters: usize,
    eps: f64,
}

impl<B: Backend, L: SpectralTarget<B>> SpectralNorm<B, L> {
    /// The weight axis used as the matrix rows.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Power iterations per training forward pass.
    pub fn power_iters(&self) -> usize {
        self.power_iters
    }

    /// The l2 normalization stability term.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Estimate the largest singular value of the wrapped weight.
    ///
    /// While training, this runs `power_iters` rounds of power iteration on the
    /// detached weight and stores the refined `u`, `v`. The returned value is
    /// ``u^T W v``, differentiable with respect to the raw weight.
    ///
    /// # Returns
    ///
    /// A ``[1]`` tensor.
    pub fn sigma(&self) -> Tensor<B, 1> {
        let weight = self.layer.weight_matrix(self.dim);
        let [rows, cols] = weight.dims();

        let iters = if B::ad_enabled() { self.power_iters } else { 0 };

        let (u, v) = if iters == 0 {
            (self.u.value(), self.v.value())
        } else {
            let detached = weight.clone().detach();
            let mut u = self.u.value_sync();
            let mut v = self.v.value_sync();

            for _ in 0..iters {
                v = l2_normalize(
                    detached
                        .clone()
                        .transpose()
                        .matmul(u.reshape([rows, 1]))
                        .reshape([cols]),
                    self.eps,
                );
                u = l2_normalize(
                    detached
                        .clone()
                        .matmul(v.clone().reshape([cols, 1]))
                        .reshape([rows]),
                    self.eps,
                );
            }

            self.u.update(u.clone().detach());
            self.v.update(v.clone().detach());
            (u, v)
        };

        u.reshape([1, rows])
            .matmul(weight)
            .matmul(v.reshape([cols, 1]))
            .reshape([1])
    }

    /// A copy of the wrapped layer with its live weight divided by [`Self::sigma`].
    pub fn normalized_layer(&self) -> L {
        self.layer.with_weight_scale(self.sigma())
    }
}

impl<B: Backend> SpectralNorm<B, Linear<B>> {
    /// Forward pass through the spectrally normalized [`Linear`] layer.
    ///
    /// # Shapes
    ///
    /// - input: ``[..., d_input]``
    /// - output: ``[..., d_output]``
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        self.normalized_layer().forward(input)
    }
}

macro_rules! spectral_conv_forward {
    ($layer:ident, $rank:literal) => {
        impl<B: Backend> SpectralNorm<B, $layer<B>> {
            #[doc = concat!("Forward pass through the spectrally normalized [`", stringify!($layer), "`] layer.")]
            ///
            /// Input and output shapes follow the wrapped layer.
            #[tracing::instrument(level = "trace", skip_all)]
            pub fn forward(
                &self,
                input: Tensor<B, $rank>,
            ) -> Tensor<B, $rank> {
                self.normalized_layer().forward(input)
            }
        }
    };
}

spectral_conv_forward!(Conv1d, 3);
spectral_conv_forward!(Conv2d, 4);
spectral_conv_forward!(Conv3d, 5);
spectral_conv_forward!(ConvTranspose1d, 3);
spectral_conv_forward!(ConvTranspose2d, 4);
spectral_conv_forward!(ConvTranspose3d, 5);

/// ``x / (||x||_2 + eps)``
fn l2_normalize<B: Backend>(
    x: Tensor<B, 1>,
    eps: f64,
) -> Tensor<B, 1> {
    let norm = x.clone().powf_scalar(2.0).sum().sqrt().add_scalar(eps);
    x.div(norm)
}
