#![recursion_limit = "256"]

use anyhow::bail;
use burn::backend::NdArray;
use burn::config::config_to_json;
use burn::module::Module;
use burn::prelude::Tensor;
use clap::Parser;
use imzoo::zoo::registry::PREFABS;
use imzoo::zoo::{ZooConfig, ZooModel};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List the registered models and exit.
    #[arg(long)]
    list: bool,

    /// Name of the model to build.
    #[arg(long, default_value = "resnet18")]
    model: String,

    /// Number of classification classes.
    #[arg(long, default_value = "1000")]
    num_classes: usize,

    /// Number of input image channels.
    #[arg(long, default_value = "3")]
    in_channels: usize,

    /// Height and width of the sample image.
    #[arg(long, default_value = "224")]
    image_size: usize,

    /// Batch size of the sample image.
    #[arg(long, default_value = "1")]
    batch_size: usize,

    /// Print the model config as JSON.
    #[arg(long)]
    dump_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.list {
        println!("Available models:");
        for prefab in PREFABS {
            println!("* \"{}\": {}", prefab.name, prefab.description);
        }
        return Ok(());
    }

    if args.image_size == 0 || args.batch_size == 0 {
        bail!("--image-size and --batch-size must be positive");
    }

    let config = ZooConfig::from_name(&args.model)?
        .with_num_classes(args.num_classes)
        .with_in_channels(args.in_channels);
    config.try_validate()?;

    if args.dump_config {
        println!("{}", config_to_json(&config));
    }

    type B = NdArray<f32>;
    let device = Default::default();

    let model: ZooModel<B> = config.init(&device);
    println!("model: {} ({})", args.model, model_kind(&model));
    println!("parameters: {}", model.num_params());

    let shape = [
        args.batch_size,
        args.in_channels,
        args.image_size,
        args.image_size,
    ];
    let output = model.forward(Tensor::<B, 4>::zeros(shape, &device));
    println!("input:  {shape:?}");
    println!("output: {:?}", output.dims());

    Ok(())
}

fn model_kind<B: burn::prelude::Backend>(model: &ZooModel<B>) -> &'static str {
    match model {
        ZooModel::ResNet(_) => "ResNet",
        ZooModel::Vgg(_) => "VGG",
        ZooModel::AlexNet(_) => "AlexNet",
        ZooModel::SqueezeNet(_) => "SqueezeNet",
        ZooModel::DenseNet(_) => "DenseNet",
    }
}
