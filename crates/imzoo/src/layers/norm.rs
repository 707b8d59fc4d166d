//! # Selectable Normalization
//!
//! The families take a norm *policy*, a [`NormalizationConfig`] whose
//! feature size is a placeholder, and size it to each layer they build
//! with [`NormalizationConfig::with_num_features`].
//!
//! Only the channel-axis norms are offered: ``BatchNorm``, ``GroupNorm``
//! and ``InstanceNorm``. ``LayerNorm`` normalizes the trailing axis of a
//! ``[batch, channels, height, width]`` map, and so is not one of them.

use burn::nn::{
    BatchNorm, BatchNormConfig, GroupNorm, GroupNormConfig, InstanceNorm, InstanceNormConfig,
};
use burn::prelude::{Backend, Config, Module, Tensor};

/// Norm layer policy.
#[derive(Config, Debug)]
#[non_exhaustive]
pub enum NormalizationConfig {
    /// ``BatchNorm``; the published default.
    Batch(BatchNormConfig),

    /// ``GroupNorm``; the channel count must divide into the groups.
    Group(GroupNormConfig),

    /// ``InstanceNorm``.
    Instance(InstanceNormConfig),
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        BatchNormConfig::new(0).into()
    }
}

impl From<BatchNormConfig> for NormalizationConfig {
    fn from(config: BatchNormConfig) -> Self {
        Self::Batch(config)
    }
}

impl From<GroupNormConfig> for NormalizationConfig {
    fn from(config: GroupNormConfig) -> Self {
        Self::Group(config)
    }
}

impl From<InstanceNormConfig> for NormalizationConfig {
    fn from(config: InstanceNormConfig) -> Self {
        Self::Instance(config)
    }
}

impl NormalizationConfig {
    /// The policy sized to `num_features` channels.
    pub fn with_num_features(
        mut self,
        num_features: usize,
    ) -> Self {
        match &mut self {
            Self::Batch(config) => config.num_features = num_features,
            Self::Group(config) => config.num_channels = num_features,
            Self::Instance(config) => config.num_channels = num_features,
        }
        self
    }

    /// The configured channel count.
    pub fn num_features(&self) -> usize {
        match self {
            Self::Batch(config) => config.num_features,
            Self::Group(config) => config.num_channels,
            Self::Instance(config) => config.num_channels,
        }
    }

    /// Check the policy can normalize `num_features` channels.
    pub fn try_validate_features(
        &self,
        num_features: usize,
    ) -> Result<(), String> {
        if num_features == 0 {
            return Err("norm over 0 channels".to_string());
        }
        if let Self::Group(config) = self {
            let groups = config.num_groups;
            if groups == 0 || num_features % groups != 0 {
                return Err(format!(
                    "num_groups({groups}) does not divide {num_features} channels"
                ));
            }
        }
        Ok(())
    }

    /// Initialize a [`Normalization`] layer.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Normalization<B> {
        match self {
            Self::Batch(config) => Normalization::Batch(config.init(device)),
            Self::Group(config) => Normalization::Group(config.init(device)),
            Self::Instance(config) => Normalization::Instance(config.init(device)),
        }
    }
}

/// A channel-axis norm layer.
#[derive(Module, Debug)]
#[non_exhaustive]
pub enum Normalization<B: Backend> {
    /// ``BatchNorm`` over ``[batch, channels, height, width]``.
    Batch(BatchNorm<B, 2>),

    /// ``GroupNorm``.
    Group(GroupNorm<B>),

    /// ``InstanceNorm``.
    Instance(InstanceNorm<B>),
}

impl<B: Backend> Normalization<B> {
    /// The channel count.
    pub fn num_features(&self) -> usize {
        match self {
            Self::Batch(norm) => norm.gamma.dims()[0],
            Self::Group(norm) => norm.num_channels,
            Self::Instance(norm) => norm.num_channels,
        }
    }

    /// Forward Pass; the output has the input's shape.
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Self::Batch(norm) => norm.forward(input),
            Self::Group(norm) => norm.forward(input),
            Self::Instance(norm) => norm.forward(input),
        }
    }

    /// Zero the scale (gamma), making the layer emit its shift (beta).
    ///
    /// Non-affine group and instance norms have no scale, and are unchanged.
    pub fn zero_init_scale(&mut self) {
        match self {
            Self::Batch(norm) => {
                norm.gamma = norm.gamma.clone().map(|t| t.zeros_like());
            }
            Self::Group(norm) => {
                norm.gamma = norm.gamma.take().map(|p| p.map(|t| t.zeros_like()));
            }
            Self::Instance(norm) => {
                norm.gamma = norm.gamma.take().map(|p| p.map(|t| t.zeros_like()));
            }
        }
    }
}
