//! # `AlexNet`
//!
//! The single-tower `AlexNet` variant from
//! "One weird trick for parallelizing convolutional neural networks".
//!
//! | layer | op                                |
//! |-------|-----------------------------------|
//! | conv1 | ``11x11/4 pad 2, in -> 64``, pool |
//! | conv2 | ``5x5 pad 2, 64 -> 192``, pool    |
//! | conv3 | ``3x3 pad 1, 192 -> 384``         |
//! | conv4 | ``3x3 pad 1, 384 -> 256``         |
//! | conv5 | ``3x3 pad 1, 256 -> 256``, pool   |
//!
//! All pools are ``3x3/2``.

use crate::layers::blocks::feature_stack::{ConvRelu2dConfig, FeatureStack, FeatureStackConfig};
use crate::layers::pool::{FeaturePool2dConfig, PoolKind};
use crate::utility::probability::is_probability;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Config, Tensor};

/// ``(out_channels, kernel, stride, padding, pool_after)``
const ALEXNET_FEATURES: [(usize, usize, usize, usize, bool); 5] = [
    (64, 11, 4, 2, true),
    (192, 5, 1, 2, true),
    (384, 3, 1, 1, false),
    (256, 3, 1, 1, false),
    (256, 3, 1, 1, true),
];

/// High-level `AlexNet` configuration.
#[derive(Config, Debug)]
pub struct AlexNetAbstractConfig {
    /// Number of classification classes.
    #[config(default = 1000)]
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Pooling operator of the feature stack.
    #[config(default = "PoolKind::Max")]
    pub pool: PoolKind,

    /// Hidden width of the classifier.
    #[config(default = 4096)]
    pub hidden_features: usize,

    /// Resolution the features are pooled to before the classifier.
    #[config(default = "[6, 6]")]
    pub pooled_resolution: [usize; 2],

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl AlexNetAbstractConfig {
    /// Convert to an [`AlexNetConfig`].
    pub fn to_structure(self) -> AlexNetConfig {
        self.into()
    }

    /// The published `AlexNet`.
    pub fn alexnet(num_classes: usize) -> Self {
        Self::new().with_num_classes(num_classes)
    }
}

impl From<AlexNetAbstractConfig> for AlexNetConfig {
    fn from(config: AlexNetAbstractConfig) -> Self {
        let mut layers = Vec::new();
        let mut channels = config.in_channels;
        for (width, kernel, stride, padding, pool_after) in ALEXNET_FEATURES {
            layers.push(
                ConvRelu2dConfig::new(
                    Conv2dConfig::new([channels, width], [kernel, kernel])
                        .with_stride([stride, stride])
                        .with_padding(PaddingConfig2d::Explicit(padding, padding)),
                )
                .into(),
            );
            if pool_after {
                layers.push(
                    FeaturePool2dConfig::new(3, 2)
                        .with_kind(config.pool)
                        .into(),
                );
            }
            channels = width;
        }

        AlexNetConfig::new(layers.into(), config.num_classes)
            .with_hidden_features(config.hidden_features)
            .with_pooled_resolution(config.pooled_resolution)
            .with_dropout(config.dropout)
    }
}

/// [`AlexNet`] Structure Config.
#[derive(Config, Debug)]
pub struct AlexNetConfig {
    /// The feature stack.
    pub features: FeatureStackConfig,

    /// Number of classification classes.
    pub num_classes: usize,

    /// Hidden width of the classifier.
    #[config(default = 4096)]
    pub hidden_features: usize,

    /// Resolution the features are pooled to before the classifier.
    #[config(default = "[6, 6]")]
    pub pooled_resolution: [usize; 2],

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl AlexNetConfig {
    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        self.features.try_validate()?;
        if !is_probability(self.dropout) {
            return Err(format!("dropout({}) is not a probability", self.dropout));
        }
        Ok(())
    }

    /// Initialize an [`AlexNet`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> AlexNet<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }

        let [ph, pw] = self.pooled_resolution;
        let d_features = self.features.out_channels().unwrap_or_default() * ph * pw;
        let d_hidden = self.hidden_features;

        AlexNet {
            features: self.features.init(device),
            pool: AdaptiveAvgPool2dConfig::new(self.pooled_resolution).init(),
            fc1: LinearConfig::new(d_features, d_hidden).init(device),
            fc2: LinearConfig::new(d_hidden, d_hidden).init(device),
            fc3: LinearConfig::new(d_hidden, self.num_classes).init(device),
            act: Relu,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// `AlexNet` model.
#[derive(Module, Debug)]
pub struct AlexNet<B: Backend> {
    /// Feature stack.
    pub features: FeatureStack<B>,

    /// Pre-classifier pool.
    pub pool: AdaptiveAvgPool2d,

    /// First classifier layer.
    pub fc1: Linear<B>,
    /// Second classifier layer.
    pub fc2: Linear<B>,
    /// Output classifier layer.
    pub fc3: Linear<B>,

    /// Classifier activation.
    pub act: Relu,
    /// Classifier dropout.
    pub dropout: Dropout,
}

impl<B: Backend> AlexNet<B> {
    /// The number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.features.in_channels()
    }

    /// The number of output classes.
    pub fn num_classes(&self) -> usize {
        self.fc3.weight.dims()[1]
    }

    /// `AlexNet` forward pass.
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

        let x = self.features.forward(input);
        let x = self.pool.forward(x).flatten(1, 3);

        let x = self.act.forward(self.fc1.forward(self.dropout.forward(x)));
        let x = self.act.forward(self.fc2.forward(self.dropout.forward(x)));
        let x = self.fc3.forward(x);

        assert_shape_contract_periodically!(
            ["batch", "num_classes"],
            &x,
            &[("batch", batch), ("num_classes", self.num_classes())]
        );

        x
    }
}
