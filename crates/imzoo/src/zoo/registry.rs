//! # Model Registry
//!
//! Every published architecture is registered as a [`ZooPreFab`] under a
//! unique name; [`build_model`] resolves a name to an initialized model.

use crate::errors::{ZooError, ZooResult};
use crate::models::alexnet::AlexNetAbstractConfig;
use crate::models::densenet::DenseNetAbstractConfig;
use crate::models::resnet::ResNetAbstractConfig;
use crate::models::squeezenet::SqueezeNetAbstractConfig;
use crate::models::vgg::VggAbstractConfig;
use crate::zoo::prefabs::StaticPreFabConfig;
use crate::zoo::zoo_config::{ZooConfig, ZooModel};
use burn::prelude::Backend;

/// Static prefab for a [`ZooConfig`].
pub type ZooPreFab = StaticPreFabConfig<ZooConfig>;

/// Number of classes of the registered prefabs.
pub const IMAGENET_CLASSES: usize = 1000;

/// ResNet-18.
pub static RESNET18: ZooPreFab = ZooPreFab {
    name: "resnet18",
    description: "ResNet-18; basic blocks [2, 2, 2, 2]",
    builder: || ResNetAbstractConfig::resnet18(IMAGENET_CLASSES).into(),
};
/// ResNet-34.
pub static RESNET34: ZooPreFab = ZooPreFab {
    name: "resnet34",
    description: "ResNet-34; basic blocks [3, 4, 6, 3]",
    builder: || ResNetAbstractConfig::resnet34(IMAGENET_CLASSES).into(),
};
/// ResNet-50.
pub static RESNET50: ZooPreFab = ZooPreFab {
    name: "resnet50",
    description: "ResNet-50; bottleneck blocks [3, 4, 6, 3]",
    builder: || ResNetAbstractConfig::resnet50(IMAGENET_CLASSES).into(),
};
/// ResNet-101.
pub static RESNET101: ZooPreFab = ZooPreFab {
    name: "resnet101",
    description: "ResNet-101; bottleneck blocks [3, 4, 23, 3]",
    builder: || ResNetAbstractConfig::resnet101(IMAGENET_CLASSES).into(),
};
/// ResNet-152.
pub static RESNET152: ZooPreFab = ZooPreFab {
    name: "resnet152",
    description: "ResNet-152; bottleneck blocks [3, 8, 36, 3]",
    builder: || ResNetAbstractConfig::resnet152(IMAGENET_CLASSES).into(),
};

/// VGG-11.
pub static VGG11: ZooPreFab = ZooPreFab {
    name: "vgg11",
    description: "VGG-11 (configuration A) with batch norm",
    builder: || VggAbstractConfig::vgg11(IMAGENET_CLASSES).into(),
};
/// VGG-13.
pub static VGG13: ZooPreFab = ZooPreFab {
    name: "vgg13",
    description: "VGG-13 (configuration B) with batch norm",
    builder: || VggAbstractConfig::vgg13(IMAGENET_CLASSES).into(),
};
/// VGG-16.
pub static VGG16: ZooPreFab = ZooPreFab {
    name: "vgg16",
    description: "VGG-16 (configuration D) with batch norm",
    builder: || VggAbstractConfig::vgg16(IMAGENET_CLASSES).into(),
};
/// VGG-19.
pub static VGG19: ZooPreFab = ZooPreFab {
    name: "vgg19",
    description: "VGG-19 (configuration E) with batch norm",
    builder: || VggAbstractConfig::vgg19(IMAGENET_CLASSES).into(),
};

/// `AlexNet`.
pub static ALEXNET: ZooPreFab = ZooPreFab {
    name: "alexnet",
    description: "AlexNet, single-tower variant",
    builder: || AlexNetAbstractConfig::alexnet(IMAGENET_CLASSES).into(),
};

/// `SqueezeNet` 1.0.
pub static SQUEEZENET1_0: ZooPreFab = ZooPreFab {
    name: "squeezenet1_0",
    description: "SqueezeNet 1.0",
    builder: || SqueezeNetAbstractConfig::squeezenet1_0(IMAGENET_CLASSES).into(),
};
/// `SqueezeNet` 1.1.
pub static SQUEEZENET1_1: ZooPreFab = ZooPreFab {
    name: "squeezenet1_1",
    description: "SqueezeNet 1.1; 2.4x less compute than 1.0",
    builder: || SqueezeNetAbstractConfig::squeezenet1_1(IMAGENET_CLASSES).into(),
};

/// DenseNet-121.
pub static DENSENET121: ZooPreFab = ZooPreFab {
    name: "densenet121",
    description: "DenseNet-121; growth 32, blocks (6, 12, 24, 16)",
    builder: || DenseNetAbstractConfig::densenet121(IMAGENET_CLASSES).into(),
};
/// DenseNet-161.
pub static DENSENET161: ZooPreFab = ZooPreFab {
    name: "densenet161",
    description: "DenseNet-161; growth 48, blocks (6, 12, 36, 24)",
    builder: || DenseNetAbstractConfig::densenet161(IMAGENET_CLASSES).into(),
};
/// DenseNet-169.
pub static DENSENET169: ZooPreFab = ZooPreFab {
    name: "densenet169",
    description: "DenseNet-169; growth 32, blocks (6, 12, 32, 32)",
    builder: || DenseNetAbstractConfig::densenet169(IMAGENET_CLASSES).into(),
};
/// DenseNet-201.
pub static DENSENET201: ZooPreFab = ZooPreFab {
    name: "densenet201",
    description: "DenseNet-201; growth 32, blocks (6, 12, 48, 32)",
    builder: || DenseNetAbstractConfig::densenet201(IMAGENET_CLASSES).into(),
};

/// All registered prefabs.
pub static PREFABS: &[&ZooPreFab] = &[
    &RESNET18,
    &RESNET34,
    &RESNET50,
    &RESNET101,
    &RESNET152,
    &VGG11,
    &VGG13,
    &VGG16,
    &VGG19,
    &ALEXNET,
    &SQUEEZENET1_0,
    &SQUEEZENET1_1,
    &DENSENET121,
    &DENSENET161,
    &DENSENET169,
    &DENSENET201,
];

/// The names of all registered prefabs, in registration order.
pub fn prefab_names() -> Vec<&'static str> {
    PREFABS.iter().map(|prefab| prefab.name).collect()
}

/// Look up a registered prefab by name.
pub fn lookup_prefab(name: &str) -> ZooResult<&'static ZooPreFab> {
    PREFABS
        .iter()
        .copied()
        .find(|prefab| prefab.name == name)
        .ok_or_else(|| ZooError::unknown_model(name))
}

/// Build a registered model by name.
///
/// # Arguments
///
/// - `name`: a registered prefab name, see [`prefab_names`].
/// - `num_classes`: the classifier width.
/// - `device`: the device to initialize on.
///
/// # Returns
///
/// A `ZooResult<ZooModel<B>>`; unknown names are a [`ZooError::UnknownModel`].
pub fn build_model<B: Backend>(
    name: &str,
    num_classes: usize,
    device: &B::Device,
) -> ZooResult<ZooModel<B>> {
    let prefab = lookup_prefab(name)?;
    let config = prefab.new_config().with_num_classes(num_classes);
    config.try_validate()?;

    tracing::debug!(
        name = prefab.name,
        family = config.family(),
        num_classes,
        "building model"
    );

    Ok(config.init(device))
}
