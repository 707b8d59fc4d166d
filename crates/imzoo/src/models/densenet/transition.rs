//! # Dense Transitions
//!
//! Between dense blocks, a [`DenseTransition`] halves the feature count
//! with a ``1x1`` conv and halves the resolution with a ``2x2/2`` average pool.

use crate::layers::norm::{Normalization, NormalizationConfig};
use crate::layers::pool::{FeaturePool2d, FeaturePool2dConfig, PoolKind};
use crate::utility::init::CONV_FAN_IN_INITIALIZER;
use burn::config::Config;
use burn::module::Module;
use burn::nn::Relu;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Tensor};

/// [`DenseTransition`] Config.
#[derive(Config, Debug)]
pub struct DenseTransitionConfig {
    /// Number of input features.
    pub in_features: usize,

    /// Number of output features.
    pub out_features: usize,

    /// Normalization policy; the feature size is matched on init.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,
}

impl DenseTransitionConfig {
    /// A transition which halves the features.
    pub fn halving(in_features: usize) -> Self {
        Self::new(in_features, in_features / 2)
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.out_features == 0 {
            return Err("out_features must be positive".to_string());
        }
        self.norm.try_validate_features(self.in_features)
    }

    /// Initialize a [`DenseTransition`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> DenseTransition<B> {
        DenseTransition {
            norm: self
                .norm
                .clone()
                .with_num_features(self.in_features)
                .init(device),
            act: Relu,
            conv: Conv2dConfig::new([self.in_features, self.out_features], [1, 1])
                .with_bias(false)
                .with_initializer(CONV_FAN_IN_INITIALIZER)
                .init(device),
            pool: FeaturePool2dConfig::new(2, 2)
                .with_kind(PoolKind::Avg)
                .init(),
        }
    }
}

/// ``norm, relu, conv1x1, avgpool2x2``.
#[derive(Module, Debug)]
pub struct DenseTransition<B: Backend> {
    /// Norm.
    pub norm: Normalization<B>,
    /// Activation.
    pub act: Relu,
    /// ``1x1`` conv.
    pub conv: Conv2d<B>,
    /// Pool.
    pub pool: FeaturePool2d,
}

impl<B: Backend> DenseTransition<B> {
    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let x = self.act.forward(self.norm.forward(input));
        let x = self.conv.forward(x);
        self.pool.forward(x)
    }
}
