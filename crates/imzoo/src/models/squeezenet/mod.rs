//! # `SqueezeNet`
//!
//! See: "SqueezeNet: AlexNet-level accuracy with 50x fewer parameters and <0.5MB model size"
//!
//! | version | stem               | fire placement (pools as `P`)  |
//! |---------|--------------------|--------------------------------|
//! | 1.0     | ``7x7/2, in -> 96`` | `P F F F P F F F F P F`       |
//! | 1.1     | ``3x3/2, in -> 64`` | `P F F P F F P F F F F`       |
//!
//! Version 1.1 has about 2.4x less compute than 1.0 at the same accuracy.

pub mod fire;

use crate::layers::blocks::feature_stack::{ConvRelu2d, ConvRelu2dConfig};
use crate::layers::pool::{FeaturePool2d, FeaturePool2dConfig, PoolKind};
use crate::models::squeezenet::fire::{Fire, FireConfig, FireMeta};
use crate::utility::init::{CONV_UNIFORM_INITIALIZER, HEAD_NORMAL_INITIALIZER};
use crate::utility::probability::is_probability;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Dropout, DropoutConfig};
use burn::prelude::{Backend, Config, Tensor};

/// Published `SqueezeNet` versions.
#[derive(Config, Debug, PartialEq, Eq, Copy)]
pub enum SqueezeNetVersion {
    /// `SqueezeNet` 1.0.
    V1_0,

    /// `SqueezeNet` 1.1.
    V1_1,
}

/// Fire module channels ``(squeeze, expand1x1, expand3x3)``; `None` is a pool.
type FireTable = &'static [Option<(usize, usize, usize)>];

const SQUEEZENET1_0_FIRES: FireTable = &[
    None,
    Some((16, 64, 64)),
    Some((16, 64, 64)),
    Some((32, 128, 128)),
    None,
    Some((32, 128, 128)),
    Some((48, 192, 192)),
    Some((48, 192, 192)),
    Some((64, 256, 256)),
    None,
    Some((64, 256, 256)),
];

const SQUEEZENET1_1_FIRES: FireTable = &[
    None,
    Some((16, 64, 64)),
    Some((16, 64, 64)),
    None,
    Some((32, 128, 128)),
    Some((32, 128, 128)),
    None,
    Some((48, 192, 192)),
    Some((48, 192, 192)),
    Some((64, 256, 256)),
    Some((64, 256, 256)),
];

impl SqueezeNetVersion {
    /// The stem conv ``(out_channels, kernel)``; the stem stride is 2.
    pub fn stem(&self) -> (usize, usize) {
        match self {
            Self::V1_0 => (96, 7),
            Self::V1_1 => (64, 3),
        }
    }

    fn fires(&self) -> FireTable {
        match self {
            Self::V1_0 => SQUEEZENET1_0_FIRES,
            Self::V1_1 => SQUEEZENET1_1_FIRES,
        }
    }
}

/// High-level `SqueezeNet` configuration.
#[derive(Config, Debug)]
pub struct SqueezeNetAbstractConfig {
    /// The version.
    pub version: SqueezeNetVersion,

    /// Number of classification classes.
    #[config(default = 1000)]
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Pooling operator of the feature stack.
    #[config(default = "PoolKind::Max")]
    pub pool: PoolKind,

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl SqueezeNetAbstractConfig {
    /// Convert to a [`SqueezeNetConfig`].
    pub fn to_structure(self) -> SqueezeNetConfig {
        self.into()
    }

    /// `SqueezeNet` 1.0.
    pub fn squeezenet1_0(num_classes: usize) -> Self {
        Self::new(SqueezeNetVersion::V1_0).with_num_classes(num_classes)
    }

    /// `SqueezeNet` 1.1.
    pub fn squeezenet1_1(num_classes: usize) -> Self {
        Self::new(SqueezeNetVersion::V1_1).with_num_classes(num_classes)
    }
}

impl From<SqueezeNetAbstractConfig> for SqueezeNetConfig {
    fn from(config: SqueezeNetAbstractConfig) -> Self {
        let (stem_width, stem_kernel) = config.version.stem();
        let stem = ConvRelu2dConfig::new(
            Conv2dConfig::new([config.in_channels, stem_width], [stem_kernel, stem_kernel])
                .with_stride([2, 2])
                .with_initializer(CONV_UNIFORM_INITIALIZER),
        )
        .with_zero_bias(true);

        let mut channels = stem_width;
        let layers = config
            .version
            .fires()
            .iter()
            .map(|entry| match entry {
                Some((squeeze, expand1x1, expand3x3)) => {
                    let fire = FireConfig::new(channels, *squeeze, *expand1x1, *expand3x3);
                    channels = fire.out_channels();
                    SqueezeLayerConfig::Fire(fire)
                }
                None => SqueezeLayerConfig::Pool(
                    FeaturePool2dConfig::new(3, 2).with_kind(config.pool),
                ),
            })
            .collect();

        SqueezeNetConfig::new(stem, layers, config.num_classes).with_dropout(config.dropout)
    }
}

/// One layer after the `SqueezeNet` stem.
#[derive(Config, Debug)]
pub enum SqueezeLayerConfig {
    /// Fire module.
    Fire(FireConfig),

    /// Pool.
    Pool(FeaturePool2dConfig),
}

impl SqueezeLayerConfig {
    /// The output channels, given the input channels.
    pub fn out_channels(
        &self,
        in_channels: usize,
    ) -> usize {
        match self {
            Self::Fire(config) => config.out_channels(),
            Self::Pool(_) => in_channels,
        }
    }
}

/// [`SqueezeNet`] Structure Config.
#[derive(Config, Debug)]
pub struct SqueezeNetConfig {
    /// Stem conv + `ReLU`.
    pub stem: ConvRelu2dConfig,

    /// Fire and pool layers.
    pub layers: Vec<SqueezeLayerConfig>,

    /// Number of classification classes.
    pub num_classes: usize,

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl SqueezeNetConfig {
    /// The channels entering the classifier.
    pub fn feature_channels(&self) -> usize {
        self.layers
            .iter()
            .fold(self.stem.conv.channels[1], |c, layer| layer.out_channels(c))
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        self.stem.try_validate()?;
        let mut channels = self.stem.conv.channels[1];
        for (idx, layer) in self.layers.iter().enumerate() {
            if let SqueezeLayerConfig::Fire(fire) = layer {
                if fire.in_channels() != channels {
                    return Err(format!(
                        "layers[{}] in_channels({}) != {}",
                        idx,
                        fire.in_channels(),
                        channels
                    ));
                }
            }
            channels = layer.out_channels(channels);
        }
        if !is_probability(self.dropout) {
            return Err(format!("dropout({}) is not a probability", self.dropout));
        }
        Ok(())
    }

    /// Initialize a [`SqueezeNet`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> SqueezeNet<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }

        let classifier = ConvRelu2dConfig::new(
            Conv2dConfig::new([self.feature_channels(), self.num_classes], [1, 1])
                .with_initializer(HEAD_NORMAL_INITIALIZER),
        )
        .with_zero_bias(true);

        SqueezeNet {
            stem: self.stem.init(device),
            layers: self
                .layers
                .iter()
                .map(|layer| match layer {
                    SqueezeLayerConfig::Fire(config) => SqueezeLayer::Fire(config.init(device)),
                    SqueezeLayerConfig::Pool(config) => SqueezeLayer::Pool(config.init()),
                })
                .collect(),
            dropout: DropoutConfig::new(self.dropout).init(),
            classifier: classifier.init(device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }
}

/// One layer after the `SqueezeNet` stem.
#[derive(Module, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum SqueezeLayer<B: Backend> {
    /// Fire module.
    Fire(Fire<B>),

    /// Pool.
    Pool(FeaturePool2d),
}

impl<B: Backend> SqueezeLayer<B> {
    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Self::Fire(layer) => layer.forward(input),
            Self::Pool(layer) => layer.forward(input),
        }
    }
}

/// `SqueezeNet` model.
#[derive(Module, Debug)]
pub struct SqueezeNet<B: Backend> {
    /// Stem conv + `ReLU`.
    pub stem: ConvRelu2d<B>,

    /// Fire and pool layers.
    pub layers: Vec<SqueezeLayer<B>>,

    /// Classifier dropout.
    pub dropout: Dropout,

    /// ``1x1`` classifier conv + `ReLU`.
    pub classifier: ConvRelu2d<B>,

    /// Output pool.
    pub pool: AdaptiveAvgPool2d,
}

impl<B: Backend> SqueezeNet<B> {
    /// The number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.stem.in_channels()
    }

    /// The number of output classes.
    pub fn num_classes(&self) -> usize {
        self.classifier.out_channels()
    }

    /// `SqueezeNet` forward pass.
    ///
    /// Maps ``[batch, in_channels, height, width]`` to ``[batch, num_classes]``.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        let [batch] = unpack_shape_contract!(
            ["batch", "in_channels", "height", "width"],
            &input,
            &["batch"],
            &[("in_channels", self.in_channels())]
        );

        let x = self.stem.forward(input);
        let x = self.layers.iter().fold(x, |x, layer| layer.forward(x));

        let x = self.classifier.forward(self.dropout.forward(x));
        let x = self.pool.forward(x).flatten(1, 3);

        assert_shape_contract_periodically!(
            ["batch", "num_classes"],
            &x,
            &[("batch", batch), ("num_classes", self.num_classes())]
        );

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;

    #[test]
    fn test_versions() {
        let v1_0 = SqueezeNetAbstractConfig::squeezenet1_0(1000).to_structure();
        v1_0.try_validate().unwrap();
        assert_eq!(v1_0.stem.conv.channels, [3, 96]);
        assert_eq!(v1_0.stem.conv.kernel_size, [7, 7]);
        assert_eq!(v1_0.feature_channels(), 512);

        let v1_1 = SqueezeNetAbstractConfig::squeezenet1_1(1000).to_structure();
        v1_1.try_validate().unwrap();
        assert_eq!(v1_1.stem.conv.channels, [3, 64]);
        assert_eq!(v1_1.stem.conv.kernel_size, [3, 3]);
        assert_eq!(v1_1.feature_channels(), 512);

        for config in [&v1_0, &v1_1] {
            let fires = config
                .layers
                .iter()
                .filter(|l| matches!(l, SqueezeLayerConfig::Fire(_)))
                .count();
            assert_eq!(fires, 8);
            assert_eq!(config.layers.len(), 11);
        }

        match &v1_0.layers[3] {
            SqueezeLayerConfig::Fire(fire) => {
                assert_eq!(fire.in_channels(), 128);
                assert_eq!(fire.squeeze_channels(), 32);
                assert_eq!(fire.out_channels(), 256);
            }
            _ => panic!("Expected a fire module"),
        }
    }

    #[test]
    fn test_pool_kind() {
        let config = SqueezeNetAbstractConfig::squeezenet1_1(10)
            .with_pool(PoolKind::Avg)
            .to_structure();
        for layer in &config.layers {
            if let SqueezeLayerConfig::Pool(pool) = layer {
                assert_eq!(pool.kind, PoolKind::Avg);
            }
        }
    }

    #[test]
    fn test_try_validate() {
        let mut config = SqueezeNetAbstractConfig::squeezenet1_0(10).to_structure();
        config.layers.remove(1);
        assert_eq!(
            config.try_validate(),
            Err("layers[1] in_channels(128) != 96".to_string())
        );

        let config = SqueezeNetAbstractConfig::squeezenet1_0(10)
            .with_dropout(-0.1)
            .to_structure();
        assert_eq!(
            config.try_validate(),
            Err("dropout(-0.1) is not a probability".to_string())
        );
    }

    #[test]
    fn test_squeezenet_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        for version in [SqueezeNetVersion::V1_0, SqueezeNetVersion::V1_1] {
            let model: SqueezeNet<B> = SqueezeNetAbstractConfig::new(version)
                .with_num_classes(10)
                .to_structure()
                .init(&device);
            assert_eq!(model.in_channels(), 3);
            assert_eq!(model.num_classes(), 10);

            let output = model.forward(Tensor::ones([2, 3, 64, 64], &device));
            assert_shape_contract!(
                ["batch", "classes"],
                &output,
                &[("batch", 2), ("classes", 10)],
            );

            let min: f32 = output.min().into_scalar();
            assert!(min >= 0.0);
        }
    }
}
