//! # Spectral Norm Targets
//!
//! Weighted layers which can be wrapped by [`SpectralNorm`](super::SpectralNorm).
//!
//! The wrapped layer keeps ownership of its raw weight parameter;
//! the wrapper only ever hands out rescaled copies of the layer.

use burn::module::{Module, Param, ParamId};
use burn::nn::Linear;
use burn::nn::conv::{Conv1d, Conv2d, Conv3d, ConvTranspose1d, ConvTranspose2d, ConvTranspose3d};
use burn::prelude::{Backend, Tensor};

/// A layer with a single weight tensor that spectral norm can rescale.
pub trait SpectralTarget<B: Backend>: Module<B> {
    /// The weight axis used as the matrix rows when no dim is configured.
    ///
    /// Convolutions (and their transposes) use `1`; everything else uses `0`.
    const DEFAULT_DIM: usize;

    /// The dims of the raw weight.
    fn weight_dims(&self) -> Vec<usize>;

    /// The raw weight, viewed as a ``[dims[dim], numel / dims[dim]]`` matrix.
    fn weight_matrix(
        &self,
        dim: usize,
    ) -> Tensor<B, 2>;

    /// A copy of this layer, whose live weight is the raw weight divided by `sigma`.
    ///
    /// The rescaled weight stays attached to the raw weight's autodiff graph.
    fn with_weight_scale(
        &self,
        sigma: Tensor<B, 1>,
    ) -> Self;
}

/// Swap `dim` to the front of `weight` and flatten the rest.
pub fn leading_matrix<B: Backend, const K: usize>(
    weight: Tensor<B, K>,
    dim: usize,
) -> Tensor<B, 2> {
    let dims = weight.dims();
    let rows = dims[dim];
    let cols = dims.iter().product::<usize>() / rows;

    let weight = if dim == 0 {
        weight
    } else {
        weight.swap_dims(0, dim)
    };
    weight.reshape([rows, cols])
}

fn rescaled<B: Backend, const K: usize>(
    weight: &Param<Tensor<B, K>>,
    sigma: Tensor<B, 1>,
) -> Param<Tensor<B, K>> {
    let scaled = weight.val().div(sigma.reshape([1usize; K]));
    Param::initialized(ParamId::new(), scaled)
}

macro_rules! spectral_target {
    ($layer:ident, $dim:literal) => {
        impl<B: Backend> SpectralTarget<B> for $layer<B> {
            const DEFAULT_DIM: usize = $dim;

            fn weight_dims(&self) -> Vec<usize> {
                self.weight.dims().to_vec()
            }

            fn weight_matrix(
                &self,
                dim: usize,
            ) -> Tensor<B, 2> {
                leading_matrix(self.weight.val(), dim)
            }

            fn with_weight_scale(
                &self,
                sigma: Tensor<B, 1>,
            ) -> Self {
                let mut layer = self.clone();
                layer.weight = rescaled(&self.weight, sigma);
                layer
            }
        }
    };
}

spectral_target!(Linear, 0);
spectral_target!(Conv1d, 1);
spectral_target!(Conv2d, 1);
spectral_target!(Conv3d, 1);
spectral_target!(ConvTranspose1d, 1);
spectral_target!(ConvTranspose2d, 1);
spectral_target!(ConvTranspose3d, 1);
