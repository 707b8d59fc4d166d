//! # `ResNet` Model
//!
//! [`ResNetAbstractConfig`] holds the published hyperparameters and lowers,
//! through [`ResNetAbstractConfig::to_structure`], to a [`ResNetConfig`];
//! [`ResNetConfig::init`] builds the [`ResNet`] module.

use crate::errors::ZooResult;
use crate::layers::blocks::conv_norm::{ConvNorm2d, ConvNorm2dConfig};
use crate::layers::norm::NormalizationConfig;
use crate::layers::pool::{FeaturePool2d, FeaturePool2dConfig};
use crate::models::resnet::block::BlockKind;
use crate::models::resnet::resnet_layers;
use crate::models::resnet::stage::{ResNetStage, ResNetStageConfig};
use crate::utility::init::CONV_INTO_RELU_INITIALIZER;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Tensor};

/// Stage base planes and strides.
const STAGES: [(usize, usize); 4] = [(64, 1), (128, 2), (256, 2), (512, 2)];

/// High-level `ResNet` model configuration.
#[derive(Config, Debug)]
pub struct ResNetAbstractConfig {
    /// Residual block kind.
    pub block: BlockKind,

    /// Blocks per stage.
    pub layers: [usize; 4],

    /// Number of classification classes.
    #[config(default = 1000)]
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Output channels of the stem conv.
    #[config(default = 64)]
    pub stem_width: usize,

    /// Groups of the bottleneck ``3x3`` convs.
    #[config(default = 1)]
    pub groups: usize,

    /// Bottleneck width per group, relative to 64.
    #[config(default = 64)]
    pub width_per_group: usize,

    /// Zero the scale of the last norm in each residual block.
    #[config(default = false)]
    pub zero_init_residual: bool,

    /// Normalization layer policy.
    #[config(default = "NormalizationConfig::default()")]
    pub normalization: NormalizationConfig,

    /// Stem pool.
    #[config(default = "FeaturePool2dConfig::new(3, 2).with_padding(1)")]
    pub stem_pool: FeaturePool2dConfig,
}

impl From<ResNetAbstractConfig> for ResNetConfig {
    fn from(config: ResNetAbstractConfig) -> Self {
        let mut in_planes = config.stem_width;
        let stages = STAGES
            .iter()
            .zip(config.layers)
            .map(|(&(planes, stride), num_blocks)| {
                let stage = ResNetStageConfig::build(
                    config.block,
                    num_blocks,
                    in_planes,
                    planes,
                    stride,
                    config.groups,
                    config.width_per_group,
                    &config.normalization,
                );
                in_planes = planes * config.block.expansion();
                stage
            })
            .collect();

        let stem = ConvNorm2dConfig::new(
            Conv2dConfig::new([config.in_channels, config.stem_width], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_bias(false)
                .with_initializer(CONV_INTO_RELU_INITIALIZER),
        )
        .with_norm(config.normalization);

        ResNetConfig::new(stem, stages, config.num_classes)
            .with_stem_pool(config.stem_pool)
            .with_zero_init_residual(config.zero_init_residual)
    }
}

impl ResNetAbstractConfig {
    /// Convert to a [`ResNetConfig`].
    pub fn to_structure(self) -> ResNetConfig {
        self.into()
    }

    /// Look up the published layout for a depth.
    ///
    /// # Returns
    ///
    /// A `ZooResult<Self>`; unknown depths are a
    /// [`crate::errors::ZooError::UnknownDepth`].
    pub fn from_depth(
        depth: usize,
        num_classes: usize,
    ) -> ZooResult<Self> {
        let (block, layers) = resnet_layers(depth)?;
        Ok(Self::new(block, layers).with_num_classes(num_classes))
    }

    /// Number of weighted layers: branch convs, the stem, and the classifier.
    pub fn depth(&self) -> usize {
        self.layers.iter().sum::<usize>() * self.block.branch_len() + 2
    }
}

/// [`ResNet`] Structure Config.
///
/// Stage sizes are checked by [`ResNetConfig::try_validate`].
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// The stem conv/norm/relu.
    pub stem: ConvNorm2dConfig,

    /// The residual stages.
    pub stages: Vec<ResNetStageConfig>,

    /// The number of classes.
    pub num_classes: usize,

    /// The stem pool.
    #[config(default = "FeaturePool2dConfig::new(3, 2).with_padding(1)")]
    pub stem_pool: FeaturePool2dConfig,

    /// Zero the scale of the last norm in each residual block.
    #[config(default = false)]
    pub zero_init_residual: bool,
}

impl ResNetConfig {
    /// The number of features entering the classifier.
    pub fn head_planes(&self) -> usize {
        match self.stages.last() {
            Some(stage) => stage.out_planes(),
            None => self.stem.out_channels(),
        }
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.stages.is_empty() {
            return Err("stages is empty".to_string());
        }
        self.stem.try_validate().map_err(|e| format!("stem: {e}"))?;
        let mut planes = self.stem.out_channels();
        for (idx, stage) in self.stages.iter().enumerate() {
            stage.try_validate().map_err(|e| format!("stages[{idx}]: {e}"))?;
            if stage.in_planes() != planes {
                return Err(format!(
                    "stages[{}].in_planes({}) != {}",
                    idx,
                    stage.in_planes(),
                    planes
                ));
            }
            planes = stage.out_planes();
        }
        Ok(())
    }

    /// Initialize a [`ResNet`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ResNet<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }

        let mut stages: Vec<ResNetStage<B>> =
            self.stages.iter().map(|c| c.init(device)).collect();
        if self.zero_init_residual {
            stages.iter_mut().for_each(|s| s.zero_init_residual());
        }

        let output_fc = LinearConfig::new(self.head_planes(), self.num_classes).init(device);

        ResNet {
            stem: self.stem.init(device),
            stem_pool: self.stem_pool.init(),
            stages,
            output_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            output_fc,
        }
    }
}

/// `ResNet` model.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    /// Stem conv/norm/relu.
    pub stem: ConvNorm2d<B>,
    /// Stem pool.
    pub stem_pool: FeaturePool2d,

    /// Residual stages.
    pub stages: Vec<ResNetStage<B>>,

    /// Head pooling.
    pub output_pool: AdaptiveAvgPool2d,
    /// Head classifier.
    pub output_fc: Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// The number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.stem.in_channels()
    }

    /// The number of output classes.
    pub fn num_classes(&self) -> usize {
        self.output_fc.weight.dims()[1]
    }

    /// `ResNet` forward pass.
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

        let x = self.stem_pool.forward(self.stem.forward(input));
        let x = self.stages.iter().fold(x, |x, stage| stage.forward(x));

        // [batch, planes, 1, 1] -> [batch, planes]
        let x = self.output_pool.forward(x).flatten(1, 3);
        let x = self.output_fc.forward(x);

        assert_shape_contract_periodically!(
            ["batch", "num_classes"],
            &x,
            &[("batch", batch), ("num_classes", self.num_classes())]
        );
        x
    }

    /// Replace the classifier with a fresh one of `num_classes` outputs.
    pub fn with_classes(
        mut self,
        num_classes: usize,
    ) -> Self {
        let [in_features, _] = self.output_fc.weight.dims();
        self.output_fc =
            LinearConfig::new(in_features, num_classes).init(&self.output_fc.weight.device());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ZooError;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;
    use burn::nn::GroupNormConfig;

    #[test]
    fn test_from_depth() {
        let config = ResNetAbstractConfig::from_depth(50, 10).unwrap();
        assert_eq!(config.block, BlockKind::Bottleneck);
        assert_eq!(config.layers, [3, 4, 6, 3]);
        assert_eq!(config.num_classes, 10);

        for depth in [18, 34, 50, 101, 152] {
            assert_eq!(
                ResNetAbstractConfig::from_depth(depth, 1000)
                    .unwrap()
                    .depth(),
                depth
            );
        }

        assert!(matches!(
            ResNetAbstractConfig::from_depth(20, 1000),
            Err(ZooError::UnknownDepth { depth: 20, .. })
        ));
    }

    #[test]
    fn test_to_structure_resnet50() {
        let config = ResNetAbstractConfig::from_depth(50, 1000)
            .unwrap()
            .to_structure();
        config.try_validate().unwrap();

        assert_eq!(config.stem.out_channels(), 64);
        assert_eq!(config.stem.stride(), 2);
        assert!(!config.stem.conv.bias);
        assert_eq!(config.head_planes(), 2048);

        let stages = config
            .stages
            .iter()
            .map(|s| (s.in_planes(), s.out_planes(), s.stride(), s.len()))
            .collect::<Vec<_>>();
        assert_eq!(
            stages,
            vec![
                (64, 256, 1, 3),
                (256, 512, 2, 4),
                (512, 1024, 2, 6),
                (1024, 2048, 2, 3),
            ]
        );
        // The first stage widens 64 -> 256 without striding.
        assert!(config.stages[0].blocks[0].shortcut().is_some());
    }

    #[test]
    fn test_to_structure_resnet18_identity_shortcut() {
        let config = ResNetAbstractConfig::from_depth(18, 1000)
            .unwrap()
            .to_structure();
        assert_eq!(config.head_planes(), 512);
        assert!(config.stages[0].blocks[0].shortcut().is_none());
        assert!(config.stages[1].blocks[0].shortcut().is_some());
    }

    #[test]
    fn test_normalization_policy_propagates() {
        let config = ResNetAbstractConfig::new(BlockKind::Basic, [1, 1, 1, 1])
            .with_normalization(GroupNormConfig::new(4, 0).into())
            .to_structure();

        assert!(matches!(config.stem.norm, NormalizationConfig::Group(_)));
        for block in config.stages.iter().flat_map(|s| s.blocks.iter()) {
            assert!(matches!(block.norm, NormalizationConfig::Group(_)));
        }
    }

    #[test]
    fn test_try_validate() {
        let mut config = ResNetAbstractConfig::new(BlockKind::Basic, [1, 1, 1, 1]).to_structure();
        config.stages.swap(1, 2);
        assert_eq!(
            config.try_validate(),
            Err("stages[1].in_planes(128) != 64".to_string())
        );

        let config = ResNetAbstractConfig::new(BlockKind::Basic, [1, 0, 1, 1]).to_structure();
        assert_eq!(
            config.try_validate(),
            Err("stages[1]: stage has no blocks".to_string())
        );
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ResNetAbstractConfig::from_depth(18, 7)
            .unwrap()
            .with_in_channels(1)
            .with_zero_init_residual(true);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resnet18.json");
        config.save(&path).unwrap();

        let loaded = ResNetAbstractConfig::load(&path).unwrap();
        assert_eq!(loaded.layers, config.layers);
        assert_eq!(loaded.block, config.block);
        assert_eq!(loaded.num_classes, 7);
        assert_eq!(loaded.in_channels, 1);
        assert!(loaded.zero_init_residual);
    }

    #[test]
    fn test_tiny_resnet_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ResNet<B> = ResNetAbstractConfig::new(BlockKind::Basic, [1, 1, 1, 1])
            .with_num_classes(5)
            .with_in_channels(1)
            .with_stem_width(8)
            .with_zero_init_residual(true)
            .to_structure()
            .init(&device);

        assert_eq!(model.in_channels(), 1);
        assert_eq!(model.num_classes(), 5);
        assert_eq!(model.stages[0].in_planes(), 8);
        assert_eq!(model.stages[3].out_planes(), 512);
        assert_eq!(model.stages[1].blocks[0].stride(), 2);

        let output = model.forward(Tensor::ones([2, 1, 33, 40], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 2), ("classes", 5)],
        );

        let model = model.with_classes(3);
        assert_eq!(model.num_classes(), 3);
    }

    #[test]
    #[should_panic(expected = "stages is empty")]
    fn test_init_empty_panics() {
        type B = NdArray<f32>;
        let device = Default::default();

        let stem = ResNetAbstractConfig::new(BlockKind::Basic, [1, 1, 1, 1])
            .to_structure()
            .stem;
        let _model: ResNet<B> = ResNetConfig::new(stem, vec![], 10).init(&device);
    }
}
