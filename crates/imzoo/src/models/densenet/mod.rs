//! # `DenseNet`
//!
//! Published layouts, from "Densely Connected Convolutional Networks":
//!
//! | depth | init features | growth | blocks               |
//! |-------|---------------|--------|----------------------|
//! | 121   | 64            | 32     | ``(6, 12, 24, 16)``  |
//! | 161   | 96            | 48     | ``(6, 12, 36, 24)``  |
//! | 169   | 64            | 32     | ``(6, 12, 32, 32)``  |
//! | 201   | 64            | 32     | ``(6, 12, 48, 32)``  |

pub mod dense_block;
pub mod densenet_model;
pub mod transition;

use crate::errors::{ZooError, ZooResult};
pub use densenet_model::{DenseNet, DenseNetAbstractConfig, DenseNetConfig};

/// A published `DenseNet` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenseNetLayout {
    /// Number of features produced by the stem.
    pub num_init_features: usize,

    /// Number of features added by each dense layer.
    pub growth_rate: usize,

    /// Number of dense layers in each block.
    pub block_config: [usize; 4],
}

/// DenseNet-121 layout.
pub const DENSENET121: DenseNetLayout = DenseNetLayout {
    num_init_features: 64,
    growth_rate: 32,
    block_config: [6, 12, 24, 16],
};
/// DenseNet-161 layout.
pub const DENSENET161: DenseNetLayout = DenseNetLayout {
    num_init_features: 96,
    growth_rate: 48,
    block_config: [6, 12, 36, 24],
};
/// DenseNet-169 layout.
pub const DENSENET169: DenseNetLayout = DenseNetLayout {
    num_init_features: 64,
    growth_rate: 32,
    block_config: [6, 12, 32, 32],
};
/// DenseNet-201 layout.
pub const DENSENET201: DenseNetLayout = DenseNetLayout {
    num_init_features: 64,
    growth_rate: 32,
    block_config: [6, 12, 48, 32],
};

/// Supported `DenseNet` depths.
pub const DENSENET_DEPTHS: &[usize] = &[121, 161, 169, 201];

/// Look up the layout of a published `DenseNet`.
pub fn densenet_layout(depth: usize) -> ZooResult<DenseNetLayout> {
    match depth {
        121 => Ok(DENSENET121),
        161 => Ok(DENSENET161),
        169 => Ok(DENSENET169),
        201 => Ok(DENSENET201),
        _ => Err(ZooError::UnknownDepth {
            family: "densenet",
            depth,
            supported: DENSENET_DEPTHS,
        }),
    }
}

impl DenseNetAbstractConfig {
    /// DenseNet-121.
    pub fn densenet121(num_classes: usize) -> Self {
        Self::from_layout(DENSENET121).with_num_classes(num_classes)
    }

    /// DenseNet-161.
    pub fn densenet161(num_classes: usize) -> Self {
        Self::from_layout(DENSENET161).with_num_classes(num_classes)
    }

    /// DenseNet-169.
    pub fn densenet169(num_classes: usize) -> Self {
        Self::from_layout(DENSENET169).with_num_classes(num_classes)
    }

    /// DenseNet-201.
    pub fn densenet201(num_classes: usize) -> Self {
        Self::from_layout(DENSENET201).with_num_classes(num_classes)
    }
}
