//! # Feature Stacks
//!
//! A [`FeatureStack`] is a plain sequence of conv/`ReLU` and pool layers,
//! the feature extractor shape shared by `VGG`, `AlexNet`, and the
//! `SqueezeNet` stem.

use crate::layers::norm::{Normalization, NormalizationConfig};
use crate::layers::pool::{FeaturePool2d, FeaturePool2dConfig};
use crate::utility::init::zero_conv2d_bias;
use burn::config::Config;
use burn::module::Module;
use burn::nn::Relu;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Tensor};

/// [`ConvRelu2d`] Config.
#[derive(Config, Debug)]
pub struct ConvRelu2dConfig {
    /// The conv config.
    pub conv: Conv2dConfig,

    /// Optional norm; the feature size is matched to the conv output channels on init.
    #[config(default = "None")]
    pub norm: Option<NormalizationConfig>,

    /// Start the conv bias at zero.
    #[config(default = false)]
    pub zero_bias: bool,
}

impl From<Conv2dConfig> for ConvRelu2dConfig {
    fn from(conv: Conv2dConfig) -> Self {
        Self::new(conv)
    }
}

impl ConvRelu2dConfig {
    /// Check the norm policy, if any, fits the conv output.
    pub fn try_validate(&self) -> Result<(), String> {
        match &self.norm {
            Some(norm) => norm.try_validate_features(self.conv.channels[1]),
            None => Ok(()),
        }
    }

    /// Initialize a [`ConvRelu2d`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ConvRelu2d<B> {
        let conv = self.conv.init(device);
        let conv = if self.zero_bias {
            zero_conv2d_bias(conv)
        } else {
            conv
        };
        let out_channels = self.conv.channels[1];
        ConvRelu2d {
            conv,
            norm: self
                .norm
                .clone()
                .map(|norm| norm.with_num_features(out_channels).init(device)),
            act: Relu,
        }
    }
}

/// Conv, optional norm, then `ReLU`.
#[derive(Module, Debug)]
pub struct ConvRelu2d<B: Backend> {
    /// Conv layer.
    pub conv: Conv2d<B>,

    /// Optional norm layer.
    pub norm: Option<Normalization<B>>,

    /// Activation.
    pub act: Relu,
}

impl<B: Backend> ConvRelu2d<B> {
    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.conv.weight.dims()[1] * self.conv.groups
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.conv.weight.dims()[0]
    }

    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        self.act.forward(x)
    }
}

/// One layer of a [`FeatureStack`].
#[derive(Config, Debug)]
pub enum FeatureLayerConfig {
    /// Conv (+ norm) + `ReLU`.
    Conv(ConvRelu2dConfig),

    /// Pool.
    Pool(FeaturePool2dConfig),
}

impl From<ConvRelu2dConfig> for FeatureLayerConfig {
    fn from(config: ConvRelu2dConfig) -> Self {
        Self::Conv(config)
    }
}

impl From<FeaturePool2dConfig> for FeatureLayerConfig {
    fn from(config: FeaturePool2dConfig) -> Self {
        Self::Pool(config)
    }
}

impl FeatureLayerConfig {
    /// The output channels, given the input channels.
    pub fn out_channels(
        &self,
        in_channels: usize,
    ) -> usize {
        match self {
            Self::Conv(config) => config.conv.channels[1],
            Self::Pool(_) => in_channels,
        }
    }

    /// Initialize a [`FeatureLayer`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> FeatureLayer<B> {
        match self {
            Self::Conv(config) => FeatureLayer::Conv(config.init(device)),
            Self::Pool(config) => FeatureLayer::Pool(config.init()),
        }
    }
}

/// One layer of a [`FeatureStack`].
#[derive(Module, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum FeatureLayer<B: Backend> {
    /// Conv (+ norm) + `ReLU`.
    Conv(ConvRelu2d<B>),

    /// Pool.
    Pool(FeaturePool2d),
}

impl<B: Backend> FeatureLayer<B> {
    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Self::Conv(layer) => layer.forward(input),
            Self::Pool(layer) => layer.forward(input),
        }
    }
}

/// [`FeatureStack`] Config.
#[derive(Config, Debug)]
pub struct FeatureStackConfig {
    /// The layers, in order.
    pub layers: Vec<FeatureLayerConfig>,
}

impl FeatureStackConfig {
    /// The input channels of the first conv.
    pub fn in_channels(&self) -> Option<usize> {
        self.layers.iter().find_map(|layer| match layer {
            FeatureLayerConfig::Conv(config) => Some(config.conv.channels[0]),
            FeatureLayerConfig::Pool(_) => None,
        })
    }

    /// The channels of the last feature map.
    pub fn out_channels(&self) -> Option<usize> {
        let in_channels = self.in_channels()?;
        Some(
            self.layers
                .iter()
                .fold(in_channels, |c, layer| layer.out_channels(c)),
        )
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        let Some(mut channels) = self.in_channels() else {
            return Err("no conv layers".to_string());
        };
        for (idx, layer) in self.layers.iter().enumerate() {
            if let FeatureLayerConfig::Conv(config) = layer {
                let [in_channels, _] = config.conv.channels;
                if in_channels != channels {
                    return Err(format!(
                        "layers[{idx}] in_channels({in_channels}) != {channels}"
                    ));
                }
                config
                    .try_validate()
                    .map_err(|err| format!("layers[{idx}]: {err}"))?;
            }
            channels = layer.out_channels(channels);
        }
        Ok(())
    }

    /// Panic if the config is not valid.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }
    }

    /// Initialize a [`FeatureStack`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> FeatureStack<B> {
        self.expect_valid();
        FeatureStack {
            layers: self.layers.iter().map(|layer| layer.init(device)).collect(),
        }
    }
}

impl From<Vec<FeatureLayerConfig>> for FeatureStackConfig {
    fn from(layers: Vec<FeatureLayerConfig>) -> Self {
        Self { layers }
    }
}

/// A sequence of [`FeatureLayer`]s.
#[derive(Module, Debug)]
pub struct FeatureStack<B: Backend> {
    /// The layers.
    pub layers: Vec<FeatureLayer<B>>,
}

impl<B: Backend> FeatureStack<B> {
    /// The input channels of the first conv.
    pub fn in_channels(&self) -> usize {
        self.layers
            .iter()
            .find_map(|layer| match layer {
                FeatureLayer::Conv(conv) => Some(conv.in_channels()),
                FeatureLayer::Pool(_) => None,
            })
            .unwrap_or_default()
    }

    /// Iterate over the conv layers.
    pub fn convs(&self) -> impl Iterator<Item = &ConvRelu2d<B>> {
        self.layers.iter().filter_map(|layer| match layer {
            FeatureLayer::Conv(conv) => Some(conv),
            FeatureLayer::Pool(_) => None,
        })
    }

    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.layers.iter().fold(input, |x, layer| layer.forward(x))
    }
}
