//! # `VGG` Core Model
//!
//! [`VggAbstractConfig`] holds the feature table plus the published
//! options, and lowers to a [`VggConfig`] via
//! [`VggAbstractConfig::to_structure`].
//!
//! [`VggConfig::init`] builds a [`Vgg`] module.

use crate::layers::blocks::feature_stack::{
    ConvRelu2dConfig, FeatureLayerConfig, FeatureStack, FeatureStackConfig,
};
use crate::layers::norm::NormalizationConfig;
use crate::layers::pool::{FeaturePool2dConfig, PoolKind};
use crate::models::vgg::VggFeature;
use crate::utility::init::{CONV_INTO_RELU_INITIALIZER, HEAD_NORMAL_INITIALIZER, zero_linear_bias};
use crate::utility::probability::is_probability;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Config, Tensor};

/// High-level `VGG` model configuration.
#[derive(Config, Debug)]
pub struct VggAbstractConfig {
    /// The feature table.
    pub features: Vec<VggFeature>,

    /// Number of classification classes.
    #[config(default = 1000)]
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Apply the published weight init.
    ///
    /// Kaiming-normal convs and ``Normal(0, 0.01)`` linears, all with zero bias;
    /// otherwise the ``burn`` layer defaults are kept.
    #[config(default = true)]
    pub init_weights: bool,

    /// Optional norm layer after each conv.
    #[config(default = "None")]
    pub normalization: Option<NormalizationConfig>,

    /// Pooling operator for the `P` entries.
    #[config(default = "PoolKind::Max")]
    pub pool: PoolKind,

    /// Hidden width of the classifier.
    #[config(default = 4096)]
    pub hidden_features: usize,

    /// Resolution the features are pooled to before the classifier.
    #[config(default = "[7, 7]")]
    pub pooled_resolution: [usize; 2],

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl VggAbstractConfig {
    /// Convert to a [`VggConfig`].
    pub fn to_structure(self) -> VggConfig {
        self.into()
    }
}

impl From<VggAbstractConfig> for VggConfig {
    fn from(config: VggAbstractConfig) -> Self {
        let mut channels = config.in_channels;
        let layers: Vec<FeatureLayerConfig> = config
            .features
            .iter()
            .map(|feature| match feature {
                VggFeature::Conv(width) => {
                    let mut conv = Conv2dConfig::new([channels, *width], [3, 3])
                        .with_padding(PaddingConfig2d::Explicit(1, 1));
                    if config.init_weights {
                        conv = conv.with_initializer(CONV_INTO_RELU_INITIALIZER);
                    }
                    channels = *width;
                    ConvRelu2dConfig::new(conv)
                        .with_norm(config.normalization.clone())
                        .with_zero_bias(config.init_weights)
                        .into()
                }
                VggFeature::Pool => FeaturePool2dConfig::new(2, 2)
                    .with_kind(config.pool)
                    .into(),
            })
            .collect();

        VggConfig::new(layers.into(), config.num_classes)
            .with_init_weights(config.init_weights)
            .with_hidden_features(config.hidden_features)
            .with_pooled_resolution(config.pooled_resolution)
            .with_dropout(config.dropout)
    }
}

/// [`Vgg`] Structure Config.
#[derive(Config, Debug)]
pub struct VggConfig {
    /// The feature stack.
    pub features: FeatureStackConfig,

    /// Number of classification classes.
    pub num_classes: usize,

    /// Initialize the classifier with ``Normal(0, 0.01)`` and zero bias.
    #[config(default = true)]
    pub init_weights: bool,

    /// Hidden width of the classifier.
    #[config(default = 4096)]
    pub hidden_features: usize,

    /// Resolution the features are pooled to before the classifier.
    #[config(default = "[7, 7]")]
    pub pooled_resolution: [usize; 2],

    /// Classifier dropout probability.
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl VggConfig {
    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        self.features.try_validate()?;
        if !is_probability(self.dropout) {
            return Err(format!("dropout({}) is not a probability", self.dropout));
        }
        Ok(())
    }

    /// Initialize a [`Vgg`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> Vgg<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }

        let [ph, pw] = self.pooled_resolution;
        let d_features = self.features.out_channels().unwrap_or_default() * ph * pw;
        let d_hidden = self.hidden_features;

        let linear = |d_input: usize, d_output: usize| {
            let config = LinearConfig::new(d_input, d_output);
            if self.init_weights {
                zero_linear_bias(
                    config
                        .with_initializer(HEAD_NORMAL_INITIALIZER)
                        .init(device),
                )
            } else {
                config.init(device)
            }
        };

        Vgg {
            features: self.features.init(device),
            pool: AdaptiveAvgPool2dConfig::new(self.pooled_resolution).init(),
            fc1: linear(d_features, d_hidden),
            fc2: linear(d_hidden, d_hidden),
            fc3: linear(d_hidden, self.num_classes),
            act: Relu,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// `VGG` model.
#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
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

impl<B: Backend> Vgg<B> {
    /// The number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.features.in_channels()
    }

    /// The number of output classes.
    pub fn num_classes(&self) -> usize {
        self.fc3.weight.dims()[1]
    }

    /// `VGG` forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, num_classes]`` logits.
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

        let x = self.pool.forward(x);
        let x = x.flatten(1, 3);

        let x = self.dropout.forward(self.act.forward(self.fc1.forward(x)));
        let x = self.dropout.forward(self.act.forward(self.fc2.forward(x)));
        let x = self.fc3.forward(x);

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
    use crate::layers::blocks::feature_stack::FeatureLayer;
    use crate::layers::pool::FeaturePool2d;
    use crate::models::vgg::VggFeature::{Conv, Pool};
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;

    fn tiny_config() -> VggAbstractConfig {
        VggAbstractConfig::new(vec![Conv(4), Pool, Conv(8), Conv(8), Pool])
            .with_num_classes(3)
            .with_in_channels(2)
            .with_hidden_features(16)
            .with_pooled_resolution([2, 2])
    }

    #[test]
    fn test_to_structure_vgg16() {
        let config = VggAbstractConfig::vgg16(1000).to_structure();
        config.try_validate().unwrap();

        let layers = &config.features.layers;
        assert_eq!(config.features.in_channels(), Some(3));
        assert_eq!(config.features.out_channels(), Some(512));
        assert_eq!(layers.len(), 18);
        assert_eq!(
            layers
                .iter()
                .filter(|l| matches!(l, FeatureLayerConfig::Conv(_)))
                .count(),
            13
        );
        match &layers[2] {
            FeatureLayerConfig::Pool(pool) => {
                assert_eq!(pool.kind, PoolKind::Max);
                assert_eq!(pool.kernel_size, 2);
                assert_eq!(pool.stride, 2);
            }
            _ => panic!("Expected a pool"),
        }
        match &layers[0] {
            FeatureLayerConfig::Conv(conv) => {
                assert_eq!(conv.conv.channels, [3, 64]);
                assert!(conv.norm.is_some());
                assert!(conv.zero_bias);
            }
            _ => panic!("Expected a conv"),
        }
    }

    #[test]
    fn test_options_propagate() {
        let config = tiny_config()
            .with_normalization(None)
            .with_pool(PoolKind::Avg)
            .to_structure();

        for layer in &config.features.layers {
            match layer {
                FeatureLayerConfig::Conv(conv) => assert!(conv.norm.is_none()),
                FeatureLayerConfig::Pool(pool) => assert_eq!(pool.kind, PoolKind::Avg),
            }
        }
    }

    #[test]
    fn test_try_validate_dropout() {
        let config = tiny_config().with_dropout(1.5).to_structure();
        assert_eq!(
            config.try_validate(),
            Err("dropout(1.5) is not a probability".to_string())
        );
    }

    #[test]
    fn test_tiny_vgg_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: Vgg<B> = tiny_config().to_structure().init(&device);
        assert_eq!(model.in_channels(), 2);
        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.features.layers.len(), 5);
        assert!(matches!(
            &model.features.layers[1],
            FeatureLayer::Pool(FeaturePool2d::Max(_))
        ));
        assert_eq!(model.fc1.weight.dims(), [8 * 2 * 2, 16]);

        let output = model.forward(Tensor::ones([2, 2, 16, 16], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 2), ("classes", 3)],
        );
    }

    #[test]
    fn test_init_weights_zero_bias() {
        type B = NdArray<f32>;
        let device = Default::default();

        let abs_sum = |linear: &Linear<B>| -> f32 {
            linear.bias.clone().unwrap().val().abs().sum().into_scalar()
        };

        let model: Vgg<B> = tiny_config().to_structure().init(&device);
        for conv in model.features.convs() {
            let total: f32 = conv.conv.bias.clone().unwrap().val().abs().sum().into_scalar();
            assert_eq!(total, 0.0);
        }
        assert_eq!(abs_sum(&model.fc3), 0.0);

        let model: Vgg<B> = tiny_config()
            .with_init_weights(false)
            .to_structure()
            .init(&device);
        assert_ne!(abs_sum(&model.fc3), 0.0);
    }
}
