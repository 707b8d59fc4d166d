//! # Selectable Feature Pooling
//!
//! Several families let the caller choose between max and average
//! pooling for their in-network (non-head) pools.
//!
//! [`PoolKind`] names the choice; [`FeaturePool2dConfig`] implements
//! [`Config`] and provides [`FeaturePool2dConfig::init`] to initialize
//! a [`FeaturePool2d`].

use bimm_contracts::assert_shape_contract_periodically;
use burn::config::Config;
use burn::module::Module;
use burn::nn::PaddingConfig2d;
use burn::nn::pool::{AvgPool2d, AvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::prelude::{Backend, Tensor};

/// The pooling operator.
#[derive(Config, Debug, PartialEq, Eq, Copy)]
pub enum PoolKind {
    /// Max pooling.
    Max,

    /// Average pooling.
    Avg,
}

#[allow(clippy::derivable_impls)]
impl Default for PoolKind {
    fn default() -> Self {
        Self::Max
    }
}

/// [`FeaturePool2d`] Config.
#[derive(Config, Debug)]
pub struct FeaturePool2dConfig {
    /// Square kernel size.
    pub kernel_size: usize,

    /// Square stride.
    pub stride: usize,

    /// Pooling operator.
    #[config(default = "PoolKind::Max")]
    pub kind: PoolKind,

    /// Symmetric explicit padding.
    #[config(default = 0)]
    pub padding: usize,
}

impl FeaturePool2dConfig {
    /// Initialize a [`FeaturePool2d`].
    pub fn init(&self) -> FeaturePool2d {
        let kernel = [self.kernel_size, self.kernel_size];
        let strides = [self.stride, self.stride];
        let padding = PaddingConfig2d::Explicit(self.padding, self.padding);

        match self.kind {
            PoolKind::Max => MaxPool2dConfig::new(kernel)
                .with_strides(strides)
                .with_padding(padding)
                .init()
                .into(),
            PoolKind::Avg => AvgPool2dConfig::new(kernel)
                .with_strides(strides)
                .with_padding(padding)
                .init()
                .into(),
        }
    }
}

/// Max or average 2d pooling.
#[derive(Module, Clone, Debug)]
pub enum FeaturePool2d {
    /// [`MaxPool2d`] layer.
    Max(MaxPool2d),

    /// [`AvgPool2d`] layer.
    Avg(AvgPool2d),
}

impl From<MaxPool2d> for FeaturePool2d {
    fn from(layer: MaxPool2d) -> Self {
        Self::Max(layer)
    }
}

impl From<AvgPool2d> for FeaturePool2d {
    fn from(layer: AvgPool2d) -> Self {
        Self::Avg(layer)
    }
}

impl FeaturePool2d {
    /// The pooling operator.
    pub fn kind(&self) -> PoolKind {
        match self {
            Self::Max(_) => PoolKind::Max,
            Self::Avg(_) => PoolKind::Avg,
        }
    }

    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, channels, in_height, in_width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, channels, out_height, out_width]``
    pub fn forward<B: Backend>(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, channels, _, _] = input.dims();

        let x = match self {
            Self::Max(pool) => pool.forward(input),
            Self::Avg(pool) => pool.forward(input),
        };

        assert_shape_contract_periodically!(
            ["batch", "channels", "out_height", "out_width"],
            &x,
            &[("batch", batch), ("channels", channels)]
        );

        x
    }
}
