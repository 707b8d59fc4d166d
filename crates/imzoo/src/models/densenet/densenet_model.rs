//! # `DenseNet` Core Model
//!
//! [`DenseNetAbstractConfig`] lowers to a [`DenseNetConfig`],
//! whose [`DenseNetConfig::init`] builds a [`DenseNet`].

use crate::errors::ZooResult;
use crate::layers::blocks::conv_norm::{ConvNorm2d, ConvNorm2dConfig};
use crate::layers::norm::{Normalization, NormalizationConfig};
use crate::layers::pool::{FeaturePool2d, FeaturePool2dConfig, PoolKind};
use crate::models::densenet::dense_block::{DenseBlock, DenseBlockConfig};
use crate::models::densenet::transition::{DenseTransition, DenseTransitionConfig};
use crate::models::densenet::{DenseNetLayout, densenet_layout};
use crate::utility::init::{CONV_FAN_IN_INITIALIZER, zero_linear_bias};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Config, Tensor};

/// High-level `DenseNet` configuration.
#[derive(Config, Debug)]
pub struct DenseNetAbstractConfig {
    /// Number of features produced by the stem.
    pub num_init_features: usize,

    /// Number of features added by each dense layer.
    pub growth_rate: usize,

    /// Number of dense layers in each block.
    pub block_config: Vec<usize>,

    /// Bottleneck width multiplier.
    #[config(default = 4)]
    pub bn_size: usize,

    /// Dropout probability after each dense layer.
    #[config(default = 0.0)]
    pub drop_rate: f64,

    /// Number of classification classes.
    #[config(default = 1000)]
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Pooling operator of the stem.
    #[config(default = "PoolKind::Max")]
    pub pool: PoolKind,

    /// Normalization layer policy.
    #[config(default = "NormalizationConfig::default()")]
    pub normalization: NormalizationConfig,
}

impl DenseNetAbstractConfig {
    /// Convert to a [`DenseNetConfig`].
    pub fn to_structure(self) -> DenseNetConfig {
        self.into()
    }

    /// Build from a published [`DenseNetLayout`].
    pub fn from_layout(layout: DenseNetLayout) -> Self {
        Self::new(
            layout.num_init_features,
            layout.growth_rate,
            layout.block_config.to_vec(),
        )
    }

    /// Look up the published layout for a depth.
    pub fn from_depth(
        depth: usize,
        num_classes: usize,
    ) -> ZooResult<Self> {
        Ok(Self::from_layout(densenet_layout(depth)?).with_num_classes(num_classes))
    }
}

impl From<DenseNetAbstractConfig> for DenseNetConfig {
    fn from(config: DenseNetAbstractConfig) -> Self {
        let stem = ConvNorm2dConfig::new(
            Conv2dConfig::new([config.in_channels, config.num_init_features], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_bias(false)
                .with_initializer(CONV_FAN_IN_INITIALIZER),
        )
        .with_norm(config.normalization.clone());

        let mut features = config.num_init_features;
        let mut blocks = Vec::new();
        let mut transitions = Vec::new();
        for (idx, &num_layers) in config.block_config.iter().enumerate() {
            if idx > 0 {
                let transition = DenseTransitionConfig::halving(features)
                    .with_norm(config.normalization.clone());
                features = transition.out_features;
                transitions.push(transition);
            }
            let block = DenseBlockConfig::new(features, num_layers, config.growth_rate)
                .with_bn_size(config.bn_size)
                .with_drop_rate(config.drop_rate)
                .with_norm(config.normalization.clone());
            features = block.out_features();
            blocks.push(block);
        }

        DenseNetConfig::new(stem, blocks, transitions, config.num_classes)
            .with_stem_pool(
                FeaturePool2dConfig::new(3, 2)
                    .with_padding(1)
                    .with_kind(config.pool),
            )
            .with_norm(config.normalization)
    }
}

/// [`DenseNet`] Structure Config.
///
/// ``transitions[i]`` sits between ``blocks[i]`` and ``blocks[i + 1]``.
#[derive(Config, Debug)]
pub struct DenseNetConfig {
    /// Stem conv/norm/act.
    pub stem: ConvNorm2dConfig,

    /// Dense blocks.
    pub blocks: Vec<DenseBlockConfig>,

    /// Transitions between the blocks.
    pub transitions: Vec<DenseTransitionConfig>,

    /// Number of classification classes.
    pub num_classes: usize,

    /// Stem pool.
    #[config(default = "FeaturePool2dConfig::new(3, 2).with_padding(1)")]
    pub stem_pool: FeaturePool2dConfig,

    /// Final norm policy; the feature size is matched on init.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,
}

impl DenseNetConfig {
    /// Number of features entering the classifier.
    pub fn num_features(&self) -> usize {
        match self.blocks.last() {
            Some(block) => block.out_features(),
            None => self.stem.out_channels(),
        }
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err("blocks is empty".to_string());
        }
        if self.transitions.len() + 1 != self.blocks.len() {
            return Err(format!(
                "{} transitions for {} blocks",
                self.transitions.len(),
                self.blocks.len()
            ));
        }

        self.stem.try_validate().map_err(|e| format!("stem: {e}"))?;

        let mut features = self.stem.out_channels();
        for (idx, block) in self.blocks.iter().enumerate() {
            if idx > 0 {
                let transition = &self.transitions[idx - 1];
                transition
                    .try_validate()
                    .map_err(|e| format!("transitions[{}]: {}", idx - 1, e))?;
                if transition.in_features != features {
                    return Err(format!(
                        "transitions[{}].in_features({}) != {}",
                        idx - 1,
                        transition.in_features,
                        features
                    ));
                }
                features = transition.out_features;
            }
            if block.in_features != features {
                return Err(format!(
                    "blocks[{}].in_features({}) != {}",
                    idx, block.in_features, features
                ));
            }
            block
                .try_validate()
                .map_err(|e| format!("blocks[{idx}]: {e}"))?;
            features = block.out_features();
        }
        self.norm
            .try_validate_features(features)
            .map_err(|e| format!("norm: {e}"))
    }

    /// Initialize a [`DenseNet`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> DenseNet<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }

        let num_features = self.num_features();

        DenseNet {
            stem: self.stem.init(device),
            stem_pool: self.stem_pool.init(),
            blocks: self.blocks.iter().map(|c| c.init(device)).collect(),
            transitions: self.transitions.iter().map(|c| c.init(device)).collect(),
            norm: self.norm.with_num_features(num_features).init(device),
            act: Relu,
            output_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            output_fc: zero_linear_bias(
                LinearConfig::new(num_features, self.num_classes).init(device),
            ),
        }
    }
}

/// `DenseNet` model.
#[derive(Module, Debug)]
pub struct DenseNet<B: Backend> {
    /// Stem conv/norm/act.
    pub stem: ConvNorm2d<B>,
    /// Stem pool.
    pub stem_pool: FeaturePool2d,

    /// Dense blocks.
    pub blocks: Vec<DenseBlock<B>>,
    /// Transitions between the blocks.
    pub transitions: Vec<DenseTransition<B>>,

    /// Final norm.
    pub norm: Normalization<B>,
    /// Final activation.
    pub act: Relu,

    /// Head pooling.
    pub output_pool: AdaptiveAvgPool2d,
    /// Head classifier.
    pub output_fc: Linear<B>,
}

impl<B: Backend> DenseNet<B> {
    /// The number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.stem.in_channels()
    }

    /// The number of features entering the classifier.
    pub fn num_features(&self) -> usize {
        self.output_fc.weight.dims()[0]
    }

    /// The number of output classes.
    pub fn num_classes(&self) -> usize {
        self.output_fc.weight.dims()[1]
    }

    /// `DenseNet` forward pass.
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

        let x = self.stem.forward(input);
        let mut x = self.stem_pool.forward(x);

        for (idx, block) in self.blocks.iter().enumerate() {
            if idx > 0 {
                x = self.transitions[idx - 1].forward(x);
            }
            x = block.forward(x);
        }

        let x = self.act.forward(self.norm.forward(x));
        let x = self.output_pool.forward(x).flatten(1, 3);
        let x = self.output_fc.forward(x);

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
    use burn::nn::InstanceNormConfig;

    fn tiny_config() -> DenseNetAbstractConfig {
        DenseNetAbstractConfig::new(8, 4, vec![2, 2])
            .with_bn_size(2)
            .with_num_classes(5)
    }

    #[test]
    fn test_densenet121_structure() {
        let config = DenseNetAbstractConfig::densenet121(1000).to_structure();
        config.try_validate().unwrap();

        assert_eq!(config.stem.out_channels(), 64);
        assert_eq!(config.blocks.len(), 4);
        assert_eq!(config.transitions.len(), 3);
        assert_eq!(
            config
                .blocks
                .iter()
                .map(|b| (b.in_features, b.num_layers))
                .collect::<Vec<_>>(),
            vec![(64, 6), (128, 12), (256, 24), (512, 16)]
        );
        assert_eq!(config.num_features(), 1024);
        assert_eq!(config.stem_pool.kind, PoolKind::Max);
    }

    #[test]
    fn test_published_num_features() {
        for (depth, expected) in [(121, 1024), (161, 2208), (169, 1664), (201, 1920)] {
            let config = DenseNetAbstractConfig::from_depth(depth, 10)
                .unwrap()
                .to_structure();
            assert_eq!(config.num_features(), expected, "densenet{depth}");
        }
    }

    #[test]
    fn test_options_propagate() {
        let config = tiny_config()
            .with_pool(PoolKind::Avg)
            .with_drop_rate(0.2)
            .with_normalization(InstanceNormConfig::new(0).into())
            .to_structure();

        assert_eq!(config.stem_pool.kind, PoolKind::Avg);
        assert!(matches!(config.stem.norm, NormalizationConfig::Instance(_)));
        for block in &config.blocks {
            assert_eq!(block.drop_rate, 0.2);
            assert_eq!(block.bn_size, 2);
            assert!(matches!(block.norm, NormalizationConfig::Instance(_)));
        }
    }

    #[test]
    fn test_try_validate() {
        let mut config = tiny_config().to_structure();
        config.transitions.clear();
        assert_eq!(
            config.try_validate(),
            Err("0 transitions for 2 blocks".to_string())
        );

        let mut config = tiny_config().to_structure();
        config.blocks[1].in_features = 3;
        assert_eq!(
            config.try_validate(),
            Err("blocks[1].in_features(3) != 8".to_string())
        );
    }

    #[test]
    fn test_tiny_densenet_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        // features: 8 -> 16 -> 8 -> 16
        let model: DenseNet<B> = tiny_config().to_structure().init(&device);
        assert_eq!(model.in_channels(), 3);
        assert_eq!(model.num_features(), 16);
        assert_eq!(model.num_classes(), 5);
        assert_eq!(model.norm.num_features(), 16);

        let bias: f32 = model
            .output_fc
            .bias
            .clone()
            .unwrap()
            .val()
            .abs()
            .sum()
            .into_scalar();
        assert_eq!(bias, 0.0);

        let output = model.forward(Tensor::ones([2, 3, 32, 32], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 2), ("classes", 5)],
        );
    }

    #[test]
    fn test_try_validate_drop_rate() {
        let config = DenseNetAbstractConfig::new(8, 4, vec![1, 1])
            .with_drop_rate(2.0)
            .to_structure();
        assert_eq!(
            config.try_validate(),
            Err("blocks[0]: layers[0]: drop_rate(2) is not a probability".to_string())
        );
    }

    #[test]
    fn test_try_validate_group_norm_width() {
        // 64 stem features divide into 4 groups, but not into 3.
        let config = DenseNetAbstractConfig::densenet121(10)
            .with_normalization(burn::nn::GroupNormConfig::new(3, 0).into())
            .to_structure();
        assert_eq!(
            config.try_validate(),
            Err("stem: num_groups(3) does not divide 64 channels".to_string())
        );

        DenseNetAbstractConfig::densenet121(10)
            .with_normalization(burn::nn::GroupNormConfig::new(4, 0).into())
            .to_structure()
            .try_validate()
            .unwrap();
    }
}
