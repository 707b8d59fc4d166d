//! # Dense Blocks
//!
//! A [`DenseBlock`] is a stack of [`DenseLayer`]s; each layer sees the
//! concatenation of the block input and every earlier layer's output.

use crate::layers::norm::{Normalization, NormalizationConfig};
use crate::utility::init::CONV_FAN_IN_INITIALIZER;
use crate::utility::probability::{expect_probability, is_probability};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Tensor};

/// [`DenseLayer`] Config.
#[derive(Config, Debug)]
pub struct DenseLayerConfig {
    /// Number of input features.
    pub in_features: usize,

    /// Number of features added by the layer.
    pub growth_rate: usize,

    /// Bottleneck width multiplier; the ``1x1`` conv emits ``bn_size * growth_rate``.
    #[config(default = 4)]
    pub bn_size: usize,

    /// Dropout probability on the new features.
    #[config(default = 0.0)]
    pub drop_rate: f64,

    /// Normalization policy; feature sizes are matched on init.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,
}

impl DenseLayerConfig {
    /// Number of output features.
    pub fn out_features(&self) -> usize {
        self.in_features + self.growth_rate
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.growth_rate == 0 || self.bn_size == 0 {
            return Err("growth_rate and bn_size must be positive".to_string());
        }
        if !is_probability(self.drop_rate) {
            return Err(format!("drop_rate({}) is not a probability", self.drop_rate));
        }
        self.norm.try_validate_features(self.in_features)?;
        self.norm
            .try_validate_features(self.bn_size * self.growth_rate)
    }

    /// Initialize a [`DenseLayer`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> DenseLayer<B> {
        let bottleneck = self.bn_size * self.growth_rate;

        DenseLayer {
            norm1: self
                .norm
                .clone()
                .with_num_features(self.in_features)
                .init(device),
            conv1: Conv2dConfig::new([self.in_features, bottleneck], [1, 1])
                .with_bias(false)
                .with_initializer(CONV_FAN_IN_INITIALIZER)
                .init(device),
            norm2: self.norm.clone().with_num_features(bottleneck).init(device),
            conv2: Conv2dConfig::new([bottleneck, self.growth_rate], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .with_initializer(CONV_FAN_IN_INITIALIZER)
                .init(device),
            act: Relu,
            dropout: DropoutConfig::new(expect_probability(self.drop_rate)).init(),
        }
    }
}

/// Pre-activation bottleneck layer: ``norm, relu, conv1x1, norm, relu, conv3x3``.
#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    /// Input norm.
    pub norm1: Normalization<B>,
    /// Bottleneck ``1x1`` conv.
    pub conv1: Conv2d<B>,
    /// Bottleneck norm.
    pub norm2: Normalization<B>,
    /// ``3x3`` growth conv.
    pub conv2: Conv2d<B>,

    /// Activation.
    pub act: Relu,
    /// Dropout on the new features.
    pub dropout: Dropout,
}

impl<B: Backend> DenseLayer<B> {
    /// Number of input features.
    pub fn in_features(&self) -> usize {
        self.conv1.weight.dims()[1]
    }

    /// Number of features added by the layer.
    pub fn growth_rate(&self) -> usize {
        self.conv2.weight.dims()[0]
    }

    /// Forward Pass.
    ///
    /// # Returns
    ///
    /// The input with ``growth_rate`` new features concatenated on the channel axis.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, height, width] = unpack_shape_contract!(
            ["batch", "in_features", "height", "width"],
            &input,
            &["batch", "height", "width"],
            &[("in_features", self.in_features())]
        );

        let x = self.act.forward(self.norm1.forward(input.clone()));
        let x = self.conv1.forward(x);
        let x = self.act.forward(self.norm2.forward(x));
        let x = self.conv2.forward(x);
        let x = self.dropout.forward(x);

        let x = Tensor::cat(vec![input, x], 1);

        assert_shape_contract_periodically!(
            ["batch", "out_features", "height", "width"],
            &x,
            &[
                ("batch", batch),
                ("out_features", self.in_features() + self.growth_rate()),
                ("height", height),
                ("width", width)
            ]
        );

        x
    }
}

/// [`DenseBlock`] Config.
#[derive(Config, Debug)]
pub struct DenseBlockConfig {
    /// Number of input features.
    pub in_features: usize,

    /// Number of dense layers.
    pub num_layers: usize,

    /// Number of features added by each layer.
    pub growth_rate: usize,

    /// Bottleneck width multiplier.
    #[config(default = 4)]
    pub bn_size: usize,

    /// Dropout probability on the new features.
    #[config(default = 0.0)]
    pub drop_rate: f64,

    /// Normalization policy.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,
}

impl DenseBlockConfig {
    /// Number of output features.
    pub fn out_features(&self) -> usize {
        self.in_features + self.num_layers * self.growth_rate
    }

    /// The config of each layer.
    pub fn layer_configs(&self) -> Vec<DenseLayerConfig> {
        (0..self.num_layers)
            .map(|idx| {
                DenseLayerConfig::new(self.in_features + idx * self.growth_rate, self.growth_rate)
                    .with_bn_size(self.bn_size)
                    .with_drop_rate(self.drop_rate)
                    .with_norm(self.norm.clone())
            })
            .collect()
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.num_layers == 0 {
            return Err("block has no layers".to_string());
        }
        self.layer_configs()
            .iter()
            .enumerate()
            .try_for_each(|(idx, layer)| {
                layer
                    .try_validate()
                    .map_err(|err| format!("layers[{idx}]: {err}"))
            })
    }

    /// Initialize a [`DenseBlock`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> DenseBlock<B> {
        DenseBlock {
            layers: self
                .layer_configs()
                .iter()
                .map(|config| config.init(device))
                .collect(),
        }
    }
}

/// A stack of [`DenseLayer`]s.
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    /// The layers.
    pub layers: Vec<DenseLayer<B>>,
}

impl<B: Backend> DenseBlock<B> {
    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.layers.iter().fold(input, |x, layer| layer.forward(x))
    }
}
