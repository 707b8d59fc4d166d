//! # `ResNet`
//!
//! Published layouts, from "Deep Residual Learning for Image Recognition":
//!
//! | depth | block        | layers            |
//! |-------|--------------|-------------------|
//! | 18    | `Basic`      | ``[2, 2, 2, 2]``  |
//! | 34    | `Basic`      | ``[3, 4, 6, 3]``  |
//! | 50    | `Bottleneck` | ``[3, 4, 6, 3]``  |
//! | 101   | `Bottleneck` | ``[3, 4, 23, 3]`` |
//! | 152   | `Bottleneck` | ``[3, 8, 36, 3]`` |

pub mod block;
pub mod resnet_model;
pub mod stage;

use crate::errors::{ZooError, ZooResult};
pub use block::BlockKind;
pub use resnet_model::{ResNet, ResNetAbstractConfig, ResNetConfig};

/// ResNet-18 block depths.
pub const RESNET18_BLOCKS: [usize; 4] = [2, 2, 2, 2];
/// ResNet-34 block depths.
pub const RESNET34_BLOCKS: [usize; 4] = [3, 4, 6, 3];
/// ResNet-50 block depths.
pub const RESNET50_BLOCKS: [usize; 4] = [3, 4, 6, 3];
/// ResNet-101 block depths.
pub const RESNET101_BLOCKS: [usize; 4] = [3, 4, 23, 3];
/// ResNet-152 block depths.
pub const RESNET152_BLOCKS: [usize; 4] = [3, 8, 36, 3];

/// Supported `ResNet` depths.
pub const RESNET_DEPTHS: &[usize] = &[18, 34, 50, 101, 152];

/// Look up the block kind and layer depths of a published `ResNet`.
pub fn resnet_layers(depth: usize) -> ZooResult<(BlockKind, [usize; 4])> {
    match depth {
        18 => Ok((BlockKind::Basic, RESNET18_BLOCKS)),
        34 => Ok((BlockKind::Basic, RESNET34_BLOCKS)),
        50 => Ok((BlockKind::Bottleneck, RESNET50_BLOCKS)),
        101 => Ok((BlockKind::Bottleneck, RESNET101_BLOCKS)),
        152 => Ok((BlockKind::Bottleneck, RESNET152_BLOCKS)),
        _ => Err(ZooError::UnknownDepth {
            family: "resnet",
            depth,
            supported: RESNET_DEPTHS,
        }),
    }
}

impl ResNetAbstractConfig {
    /// ResNet-18.
    pub fn resnet18(num_classes: usize) -> Self {
        Self::new(BlockKind::Basic, RESNET18_BLOCKS).with_num_classes(num_classes)
    }

    /// ResNet-34.
    pub fn resnet34(num_classes: usize) -> Self {
        Self::new(BlockKind::Basic, RESNET34_BLOCKS).with_num_classes(num_classes)
    }

    /// ResNet-50.
    pub fn resnet50(num_classes: usize) -> Self {
        Self::new(BlockKind::Bottleneck, RESNET50_BLOCKS).with_num_classes(num_classes)
    }

    /// ResNet-101.
    pub fn resnet101(num_classes: usize) -> Self {
        Self::new(BlockKind::Bottleneck, RESNET101_BLOCKS).with_num_classes(num_classes)
    }

    /// ResNet-152.
    pub fn resnet152(num_classes: usize) -> Self {
        Self::new(BlockKind::Bottleneck, RESNET152_BLOCKS).with_num_classes(num_classes)
    }
}
