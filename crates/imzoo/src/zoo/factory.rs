//! # Family Factories
//!
//! Depth-indexed constructors, one per family with a depth table.
//! Each resolves the depth, applies the options, validates the lowered
//! structure, and builds the model.

use crate::errors::{ZooError, ZooResult};
use crate::layers::norm::NormalizationConfig;
use crate::layers::pool::PoolKind;
use crate::models::densenet::{DenseNet, DenseNetAbstractConfig};
use crate::models::resnet::{ResNet, ResNetAbstractConfig};
use crate::models::vgg::{Vgg, VggAbstractConfig};
use burn::prelude::Backend;

/// Build a published `ResNet`.
///
/// # Arguments
///
/// - `num_layers`: the depth; one of [`crate::models::resnet::RESNET_DEPTHS`].
/// - `num_classes`: the classifier width.
/// - `in_channels`: the number of input image channels.
/// - `zero_init_residual`: zero the last norm scale of every residual block.
/// - `normalization`: the norm layer policy.
/// - `device`: the device to initialize on.
pub fn create_resnet<B: Backend>(
    num_layers: usize,
    num_classes: usize,
    in_channels: usize,
    zero_init_residual: bool,
    normalization: NormalizationConfig,
    device: &B::Device,
) -> ZooResult<ResNet<B>> {
    let config = ResNetAbstractConfig::from_depth(num_layers, num_classes)?
        .with_in_channels(in_channels)
        .with_zero_init_residual(zero_init_residual)
        .with_normalization(normalization);

    let structure = config.to_structure();
    structure.try_validate().map_err(ZooError::invalid_config)?;

    tracing::debug!(num_layers, num_classes, in_channels, "creating resnet");
    Ok(structure.init(device))
}

/// Build a published `VGG`.
///
/// # Arguments
///
/// - `num_layers`: the depth; one of [`crate::models::vgg::VGG_DEPTHS`].
/// - `num_classes`: the classifier width.
/// - `in_channels`: the number of input image channels.
/// - `init_weights`: apply the published weight init.
/// - `normalization`: the norm layer after each conv, if any.
/// - `pool`: the feature stack pooling operator.
/// - `device`: the device to initialize on.
pub fn create_vgg<B: Backend>(
    num_layers: usize,
    num_classes: usize,
    in_channels: usize,
    init_weights: bool,
    normalization: Option<NormalizationConfig>,
    pool: PoolKind,
    device: &B::Device,
) -> ZooResult<Vgg<B>> {
    let config = VggAbstractConfig::from_depth(num_layers, num_classes)?
        .with_in_channels(in_channels)
        .with_init_weights(init_weights)
        .with_normalization(normalization)
        .with_pool(pool);

    let structure = config.to_structure();
    structure.try_validate().map_err(ZooError::invalid_config)?;

    tracing::debug!(num_layers, num_classes, in_channels, "creating vgg");
    Ok(structure.init(device))
}

/// Build a published `DenseNet`.
///
/// # Arguments
///
/// - `num_layers`: the depth; one of [`crate::models::densenet::DENSENET_DEPTHS`].
/// - `bn_size`: the bottleneck width multiplier.
/// - `drop_rate`: the dropout probability after each dense layer.
/// - `num_classes`: the classifier width.
/// - `pool`: the stem pooling operator.
/// - `normalization`: the norm layer policy.
/// - `device`: the device to initialize on.
///
/// # Returns
///
/// A [`ZooError::InvalidConfig`] if `drop_rate` is not a probability,
/// or the norm policy does not fit the layer widths.
pub fn create_densenet<B: Backend>(
    num_layers: usize,
    bn_size: usize,
    drop_rate: f64,
    num_classes: usize,
    pool: PoolKind,
    normalization: NormalizationConfig,
    device: &B::Device,
) -> ZooResult<DenseNet<B>> {
    let config = DenseNetAbstractConfig::from_depth(num_layers, num_classes)?
        .with_bn_size(bn_size)
        .with_drop_rate(drop_rate)
        .with_pool(pool)
        .with_normalization(normalization);

    let structure = config.to_structure();
    structure.try_validate().map_err(ZooError::invalid_config)?;

    tracing::debug!(num_layers, bn_size, drop_rate, num_classes, "creating densenet");
    Ok(structure.init(device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resnet::RESNET_DEPTHS;
    use crate::models::vgg::VGG_DEPTHS;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;
    use burn::nn::GroupNormConfig;
    use burn::prelude::Tensor;

    #[test]
    fn test_unknown_depths() {
        type B = NdArray<f32>;
        let device = Default::default();

        assert_eq!(
            create_resnet::<B>(20, 10, 3, false, Default::default(), &device).unwrap_err(),
            ZooError::UnknownDepth {
                family: "resnet",
                depth: 20,
                supported: RESNET_DEPTHS,
            }
        );
        assert_eq!(
            create_vgg::<B>(12, 10, 3, true, None, PoolKind::Max, &device).unwrap_err(),
            ZooError::UnknownDepth {
                family: "vgg",
                depth: 12,
                supported: VGG_DEPTHS,
            }
        );
        assert!(matches!(
            create_densenet::<B>(122, 4, 0.0, 10, PoolKind::Max, Default::default(), &device),
            Err(ZooError::UnknownDepth {
                family: "densenet",
                depth: 122,
                ..
            })
        ));
    }

    #[test]
    fn test_densenet_bad_drop_rate() {
        type B = NdArray<f32>;
        let device = Default::default();

        assert!(matches!(
            create_densenet::<B>(121, 4, 1.5, 10, PoolKind::Max, Default::default(), &device),
            Err(ZooError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_create_resnet() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model = create_resnet::<B>(
            18,
            6,
            1,
            true,
            GroupNormConfig::new(4, 0).into(),
            &device,
        )
        .unwrap();
        assert_eq!(model.in_channels(), 1);
        assert_eq!(model.num_classes(), 6);

        let output = model.forward(Tensor::ones([1, 1, 32, 32], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 1), ("classes", 6)],
        );
    }

    #[test]
    fn test_create_resnet_bad_group_norm() {
        type B = NdArray<f32>;
        let device = Default::default();

        assert_eq!(
            create_resnet::<B>(18, 10, 3, false, GroupNormConfig::new(3, 0).into(), &device)
                .unwrap_err(),
            ZooError::invalid_config("stem: num_groups(3) does not divide 64 channels")
        );
    }

    #[test]
    fn test_create_vgg() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model = create_vgg::<B>(11, 4, 1, false, None, PoolKind::Avg, &device).unwrap();
        assert_eq!(model.in_channels(), 1);
        assert_eq!(model.features.convs().count(), 8);
        assert!(model.features.convs().all(|conv| conv.norm.is_none()));
        for layer in &model.features.layers {
            if let crate::layers::blocks::feature_stack::FeatureLayer::Pool(pool) = layer {
                assert_eq!(pool.kind(), PoolKind::Avg);
            }
        }

        let output = model.forward(Tensor::ones([1, 1, 32, 32], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 1), ("classes", 4)],
        );

        assert!(matches!(
            create_vgg::<B>(
                11,
                4,
                3,
                true,
                Some(GroupNormConfig::new(5, 0).into()),
                PoolKind::Max,
                &device,
            ),
            Err(ZooError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_create_densenet() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model =
            create_densenet::<B>(121, 2, 0.1, 3, PoolKind::Avg, Default::default(), &device)
                .unwrap();
        assert_eq!(model.in_channels(), 3);
        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.num_features(), 1024);
        assert_eq!(model.stem_pool.kind(), PoolKind::Avg);

        let layer = &model.blocks[0].layers[0];
        assert_eq!(layer.conv1.weight.dims(), [2 * 32, 64, 1, 1]);
        assert_eq!(layer.dropout.prob, 0.1);

        let output = model.forward(Tensor::ones([1, 3, 32, 32], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 1), ("classes", 3)],
        );
    }
}
