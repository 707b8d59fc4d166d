//! # `VGG`
//!
//! Published feature stacks, from "Very Deep Convolutional Networks for
//! Large-Scale Image Recognition"; integers are 3x3 conv widths,
//! `P` is a 2x2/2 pool:
//!
//! | depth | features                                                            |
//! |-------|---------------------------------------------------------------------|
//! | 11    | ``64 P 128 P 256 256 P 512 512 P 512 512 P``                        |
//! | 13    | ``64 64 P 128 128 P 256 256 P 512 512 P 512 512 P``                 |
//! | 16    | ``64 64 P 128 128 P 256 256 256 P 512 512 512 P 512 512 512 P``     |
//! | 19    | ``64 64 P 128 128 P 256 x4 P 512 x4 P 512 x4 P``                    |

pub mod vgg_model;

use crate::errors::{ZooError, ZooResult};
use crate::layers::norm::NormalizationConfig;
use burn::config::Config;
pub use vgg_model::{Vgg, VggAbstractConfig, VggConfig};

/// One entry of a `VGG` feature table.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum VggFeature {
    /// A 3x3 conv (+ norm) + `ReLU` with this many output channels.
    Conv(usize),

    /// A 2x2/2 pool.
    Pool,
}

/// Supported `VGG` depths.
pub const VGG_DEPTHS: &[usize] = &[11, 13, 16, 19];

use VggFeature::{Conv as C, Pool as P};

#[rustfmt::skip]
const VGG11_TABLE: &[VggFeature] = &[
    C(64), P, C(128), P, C(256), C(256), P, C(512), C(512), P, C(512), C(512), P,
];
#[rustfmt::skip]
const VGG13_TABLE: &[VggFeature] = &[
    C(64), C(64), P, C(128), C(128), P, C(256), C(256), P, C(512), C(512), P, C(512), C(512), P,
];
#[rustfmt::skip]
const VGG16_TABLE: &[VggFeature] = &[
    C(64), C(64), P, C(128), C(128), P, C(256), C(256), C(256), P, C(512), C(512), C(512), P,
    C(512), C(512), C(512), P,
];
#[rustfmt::skip]
const VGG19_TABLE: &[VggFeature] = &[
    C(64), C(64), P, C(128), C(128), P, C(256), C(256), C(256), C(256), P, C(512), C(512),
    C(512), C(512), P, C(512), C(512), C(512), C(512), P,
];

/// Look up the feature stack of a published `VGG`.
pub fn vgg_features(depth: usize) -> ZooResult<Vec<VggFeature>> {
    let table = match depth {
        11 => VGG11_TABLE,
        13 => VGG13_TABLE,
        16 => VGG16_TABLE,
        19 => VGG19_TABLE,
        _ => {
            return Err(ZooError::UnknownDepth {
                family: "vgg",
                depth,
                supported: VGG_DEPTHS,
            });
        }
    };
    Ok(table.to_vec())
}

impl VggAbstractConfig {
    /// A batch-norm VGG over `features`.
    fn with_batch_norm(
        features: Vec<VggFeature>,
        num_classes: usize,
    ) -> Self {
        Self::new(features)
            .with_num_classes(num_classes)
            .with_normalization(Some(NormalizationConfig::default()))
    }

    /// Look up the published layout for a depth.
    ///
    /// The layers get batch norm; use `with_normalization(None)` for the plain net.
    pub fn from_depth(
        depth: usize,
        num_classes: usize,
    ) -> ZooResult<Self> {
        Ok(Self::with_batch_norm(vgg_features(depth)?, num_classes))
    }

    /// VGG-11.
    pub fn vgg11(num_classes: usize) -> Self {
        Self::with_batch_norm(VGG11_TABLE.to_vec(), num_classes)
    }

    /// VGG-13.
    pub fn vgg13(num_classes: usize) -> Self {
        Self::with_batch_norm(VGG13_TABLE.to_vec(), num_classes)
    }

    /// VGG-16.
    pub fn vgg16(num_classes: usize) -> Self {
        Self::with_batch_norm(VGG16_TABLE.to_vec(), num_classes)
    }

    /// VGG-19.
    pub fn vgg19(num_classes: usize) -> Self {
        Self::with_batch_norm(VGG19_TABLE.to_vec(), num_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_convs(features: &[VggFeature]) -> usize {
        features
            .iter()
            .filter(|f| matches!(f, VggFeature::Conv(_)))
            .count()
    }

    #[test]
    fn test_vgg_features_depths() {
        for &depth in VGG_DEPTHS {
            let features = vgg_features(depth).unwrap();
            // depth counts the convs plus the three classifier layers.
            assert_eq!(count_convs(&features) + 3, depth);
            assert_eq!(
                features.iter().filter(|f| **f == VggFeature::Pool).count(),
                5
            );
            assert_eq!(features.last(), Some(&VggFeature::Pool));
        }
    }

    #[test]
    fn test_vgg11_table() {
        use VggFeature::{Conv, Pool};
        assert_eq!(
            vgg_features(11).unwrap(),
            vec![
                Conv(64),
                Pool,
                Conv(128),
                Pool,
                Conv(256),
                Conv(256),
                Pool,
                Conv(512),
                Conv(512),
                Pool,
                Conv(512),
                Conv(512),
                Pool,
            ]
        );
    }

    #[test]
    fn test_vgg_unknown_depth() {
        assert_eq!(
            vgg_features(12),
            Err(ZooError::UnknownDepth {
                family: "vgg",
                depth: 12,
                supported: VGG_DEPTHS,
            })
        );
    }

    #[test]
    fn test_named_constructors_match_table() {
        for (config, depth) in [
            (VggAbstractConfig::vgg11(10), 11),
            (VggAbstractConfig::vgg13(10), 13),
            (VggAbstractConfig::vgg16(10), 16),
            (VggAbstractConfig::vgg19(10), 19),
        ] {
            assert_eq!(config.features, vgg_features(depth).unwrap());
            assert_eq!(config.num_classes, 10);
        }
    }
}
