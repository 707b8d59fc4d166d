//! # `ResNet` Stages
//!
//! A [`ResNetStage`] is a run of [`ResidualBlock`]s at one plane width;
//! only the first block of a stage may change stride or planes.

use crate::layers::norm::NormalizationConfig;
use crate::models::resnet::block::{BlockKind, ResidualBlock, ResidualBlockConfig};
use burn::config::Config;
use burn::module::Module;
use burn::prelude::{Backend, Tensor};

/// [`ResNetStage`] Config.
#[derive(Config, Debug)]
pub struct ResNetStageConfig {
    /// The blocks of the stage.
    pub blocks: Vec<ResidualBlockConfig>,
}

impl ResNetStageConfig {
    /// Build a stage of `num_blocks` blocks of the same kind.
    ///
    /// The first block takes `in_planes` and `stride`; the rest take
    /// the stage output and stride 1.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        kind: BlockKind,
        num_blocks: usize,
        in_planes: usize,
        planes: usize,
        stride: usize,
        groups: usize,
        width_per_group: usize,
        norm: &NormalizationConfig,
    ) -> Self {
        let out_planes = planes * kind.expansion();
        let blocks = (0..num_blocks)
            .map(|idx| {
                let (in_planes, stride) = match idx {
                    0 => (in_planes, stride),
                    _ => (out_planes, 1),
                };
                ResidualBlockConfig::new(kind, in_planes, planes)
                    .with_stride(stride)
                    .with_groups(groups)
                    .with_width_per_group(width_per_group)
                    .with_norm(norm.clone())
            })
            .collect();
        Self { blocks }
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Is the stage empty?
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of input planes.
    pub fn in_planes(&self) -> usize {
        self.blocks.first().map(|b| b.in_planes).unwrap_or_default()
    }

    /// Number of output planes.
    pub fn out_planes(&self) -> usize {
        self.blocks
            .last()
            .map(|b| b.out_planes())
            .unwrap_or_default()
    }

    /// Total stride of the stage.
    pub fn stride(&self) -> usize {
        self.blocks.iter().map(|b| b.stride).product()
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err("stage has no blocks".to_string());
        }
        let mut planes = self.in_planes();
        for (idx, block) in self.blocks.iter().enumerate() {
            block.try_validate()?;
            if block.in_planes != planes {
                return Err(format!(
                    "blocks[{}].in_planes({}) != {}",
                    idx, block.in_planes, planes
                ));
            }
            planes = block.out_planes();
        }
        Ok(())
    }

    /// Initialize a [`ResNetStage`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ResNetStage<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }
        ResNetStage {
            blocks: self.blocks.iter().map(|b| b.init(device)).collect(),
        }
    }
}

/// A `ResNet` stage.
#[derive(Module, Debug)]
pub struct ResNetStage<B: Backend> {
    /// The blocks.
    pub blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> ResNetStage<B> {
    /// Number of input planes.
    pub fn in_planes(&self) -> usize {
        self.blocks.first().map(|b| b.in_planes()).unwrap_or_default()
    }

    /// Number of output planes.
    pub fn out_planes(&self) -> usize {
        self.blocks
            .last()
            .map(|b| b.out_planes())
            .unwrap_or_default()
    }

    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.blocks.iter().fold(input, |x, block| block.forward(x))
    }

    /// Zero the last norm of every block.
    pub fn zero_init_residual(&mut self) {
        self.blocks
            .iter_mut()
            .for_each(|b| b.zero_init_last_norm());
    }
}
