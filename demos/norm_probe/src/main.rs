#![recursion_limit = "256"]

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;
use burn::prelude::{Backend, Tensor};
use burn::tensor::Distribution;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zsi2i::compat::activation_wrapper::ActivationConfig;
use zsi2i::layers::blocks::cna::{CNA2d, CNA2dConfig, NormedConv2d};
use zsi2i::layers::norm::{NormLayerBuilder, build_norm_layer};
use zsi2i::utility::burn::record::format_record;

// $ --norm-type=spectral --power-iters=2 --steps=5
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Normalization layer: batch | instance | spectral.
    #[arg(long, default_value = "instance")]
    norm_type: String,

    /// Input channels.
    #[arg(long, default_value_t = 3)]
    in_channels: usize,

    /// Output channels.
    #[arg(long, default_value_t = 8)]
    out_channels: usize,

    /// Input height and width.
    #[arg(long, default_value_t = 32)]
    size: usize,

    /// Batch size.
    #[arg(short, long, default_value_t = 2)]
    batch_size: usize,

    /// Power iterations per step; spectral norm only.
    #[arg(long)]
    power_iters: Option<usize>,

    /// Number of training-mode forward passes.
    #[arg(long, default_value_t = 3)]
    steps: usize,

    /// Print the module record layout.
    #[arg(long)]
    show_record: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    type B = Autodiff<NdArray<f32>>;
    let device = Default::default();

    probe::<B>(&args, &device)
}

/// Build a pix2pix-style down-sampling block and run it in training and inference modes.
fn probe<B: burn::tensor::backend::AutodiffBackend>(
    args: &Args,
    device: &B::Device,
) -> anyhow::Result<()> {
    let norm = match (build_norm_layer(&args.norm_type)?, args.power_iters) {
        (NormLayerBuilder::Spectral(config), Some(power_iters)) => {
            config.with_power_iters(power_iters).into()
        }
        (norm, _) => norm,
    };
    tracing::info!(kind = %norm.kind(), "building block");

    let conv = Conv2dConfig::new([args.in_channels, args.out_channels], [4, 4])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1));

    let block: CNA2d<B> = CNA2dConfig::new(conv, norm)
        .with_act(ActivationConfig::gan_leaky_relu())
        .init(device)?;

    let shape = [args.batch_size, args.in_channels, args.size, args.size];
    let input: Tensor<B, 4> = Tensor::random(shape, Distribution::Default, device);

    for step in 0..args.steps {
        let output = block.forward(input.clone());
        log_stats("train", step, output);
    }

    let valid = block.valid();
    if let NormedConv2d::Spectral(sn) = &valid.conv {
        // No power iterations run on the inference backend.
        let sigma = sn.sigma().into_scalar();
        tracing::info!(sigma = ?sigma, power_iters = sn.power_iters(), "spectral estimate");
    }
    let output = valid.forward(input.inner());
    log_stats("valid", 0, output);

    if args.show_record {
        println!("{}", format_record::<B::InnerBackend, _>(valid.into_record())?);
    }

    Ok(())
}

fn log_stats<B: Backend>(
    phase: &str,
    step: usize,
    output: Tensor<B, 4>,
) {
    let dims = output.dims();
    let mean = output.clone().mean().into_scalar();
    let var = output.var(0).mean().into_scalar();
    tracing::info!(phase, step, ?dims, mean = ?mean, var = ?var, "block output");
}
