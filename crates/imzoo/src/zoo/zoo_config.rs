//! # Family-Agnostic Model Configs
//!
//! [`ZooConfig`] wraps the abstract config of every family;
//! [`ZooModel`] wraps the matching module.

use crate::errors::{ZooError, ZooResult};
use crate::models::alexnet::{AlexNet, AlexNetAbstractConfig};
use crate::models::densenet::{DenseNet, DenseNetAbstractConfig};
use crate::models::resnet::{ResNet, ResNetAbstractConfig};
use crate::models::squeezenet::{SqueezeNet, SqueezeNetAbstractConfig};
use crate::models::vgg::{Vgg, VggAbstractConfig};
use crate::zoo::registry::lookup_prefab;
use burn::module::Module;
use burn::prelude::{Backend, Config, Tensor};

/// Abstract config of any model family.
#[derive(Config, Debug)]
pub enum ZooConfig {
    /// `ResNet`.
    ResNet(ResNetAbstractConfig),

    /// `VGG`.
    Vgg(VggAbstractConfig),

    /// `AlexNet`.
    AlexNet(AlexNetAbstractConfig),

    /// `SqueezeNet`.
    SqueezeNet(SqueezeNetAbstractConfig),

    /// `DenseNet`.
    DenseNet(DenseNetAbstractConfig),
}

impl From<ResNetAbstractConfig> for ZooConfig {
    fn from(config: ResNetAbstractConfig) -> Self {
        Self::ResNet(config)
    }
}

impl From<VggAbstractConfig> for ZooConfig {
    fn from(config: VggAbstractConfig) -> Self {
        Self::Vgg(config)
    }
}

impl From<AlexNetAbstractConfig> for ZooConfig {
    fn from(config: AlexNetAbstractConfig) -> Self {
        Self::AlexNet(config)
    }
}

impl From<SqueezeNetAbstractConfig> for ZooConfig {
    fn from(config: SqueezeNetAbstractConfig) -> Self {
        Self::SqueezeNet(config)
    }
}

impl From<DenseNetAbstractConfig> for ZooConfig {
    fn from(config: DenseNetAbstractConfig) -> Self {
        Self::DenseNet(config)
    }
}

impl ZooConfig {
    /// Look up the prefab config registered under `name`.
    pub fn from_name(name: &str) -> ZooResult<Self> {
        Ok(lookup_prefab(name)?.new_config())
    }

    /// The model family name.
    pub fn family(&self) -> &'static str {
        match self {
            Self::ResNet(_) => "resnet",
            Self::Vgg(_) => "vgg",
            Self::AlexNet(_) => "alexnet",
            Self::SqueezeNet(_) => "squeezenet",
            Self::DenseNet(_) => "densenet",
        }
    }

    /// Number of classification classes.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::ResNet(config) => config.num_classes,
            Self::Vgg(config) => config.num_classes,
            Self::AlexNet(config) => config.num_classes,
            Self::SqueezeNet(config) => config.num_classes,
            Self::DenseNet(config) => config.num_classes,
        }
    }

    /// Replace the number of classification classes.
    pub fn with_num_classes(
        self,
        num_classes: usize,
    ) -> Self {
        match self {
            Self::ResNet(config) => config.with_num_classes(num_classes).into(),
            Self::Vgg(config) => config.with_num_classes(num_classes).into(),
            Self::AlexNet(config) => config.with_num_classes(num_classes).into(),
            Self::SqueezeNet(config) => config.with_num_classes(num_classes).into(),
            Self::DenseNet(config) => config.with_num_classes(num_classes).into(),
        }
    }

    /// Number of input image channels.
    pub fn in_channels(&self) -> usize {
        match self {
            Self::ResNet(config) => config.in_channels,
            Self::Vgg(config) => config.in_channels,
            Self::AlexNet(config) => config.in_channels,
            Self::SqueezeNet(config) => config.in_channels,
            Self::DenseNet(config) => config.in_channels,
        }
    }

    /// Replace the number of input image channels.
    pub fn with_in_channels(
        self,
        in_channels: usize,
    ) -> Self {
        match self {
            Self::ResNet(config) => config.with_in_channels(in_channels).into(),
            Self::Vgg(config) => config.with_in_channels(in_channels).into(),
            Self::AlexNet(config) => config.with_in_channels(in_channels).into(),
            Self::SqueezeNet(config) => config.with_in_channels(in_channels).into(),
            Self::DenseNet(config) => config.with_in_channels(in_channels).into(),
        }
    }

    /// Check that the lowered structure config is valid.
    pub fn try_validate(&self) -> ZooResult<()> {
        let result = match self.clone() {
            Self::ResNet(config) => config.to_structure().try_validate(),
            Self::Vgg(config) => config.to_structure().try_validate(),
            Self::AlexNet(config) => config.to_structure().try_validate(),
            Self::SqueezeNet(config) => config.to_structure().try_validate(),
            Self::DenseNet(config) => config.to_structure().try_validate(),
        };
        result.map_err(ZooError::invalid_config)
    }

    /// Initialize a [`ZooModel`].
    ///
    /// # Panics
    ///
    /// If the config is not valid; see [`ZooConfig::try_validate`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ZooModel<B> {
        match self {
            Self::ResNet(config) => ZooModel::ResNet(config.to_structure().init(device)),
            Self::Vgg(config) => ZooModel::Vgg(config.to_structure().init(device)),
            Self::AlexNet(config) => ZooModel::AlexNet(config.to_structure().init(device)),
            Self::SqueezeNet(config) => ZooModel::SqueezeNet(config.to_structure().init(device)),
            Self::DenseNet(config) => ZooModel::DenseNet(config.to_structure().init(device)),
        }
    }
}

/// A model of any family.
#[derive(Module, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum ZooModel<B: Backend> {
    /// `ResNet`.
    ResNet(ResNet<B>),

    /// `VGG`.
    Vgg(Vgg<B>),

    /// `AlexNet`.
    AlexNet(AlexNet<B>),

    /// `SqueezeNet`.
    SqueezeNet(SqueezeNet<B>),

    /// `DenseNet`.
    DenseNet(DenseNet<B>),
}

impl<B: Backend> ZooModel<B> {
    /// Number of input image channels.
    pub fn in_channels(&self) -> usize {
        match self {
            Self::ResNet(model) => model.in_channels(),
            Self::Vgg(model) => model.in_channels(),
            Self::AlexNet(model) => model.in_channels(),
            Self::SqueezeNet(model) => model.in_channels(),
            Self::DenseNet(model) => model.in_channels(),
        }
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::ResNet(model) => model.num_classes(),
            Self::Vgg(model) => model.num_classes(),
            Self::AlexNet(model) => model.num_classes(),
            Self::SqueezeNet(model) => model.num_classes(),
            Self::DenseNet(model) => model.num_classes(),
        }
    }

    /// Forward pass.
    ///
    /// Maps ``[batch, in_channels, height, width]`` to ``[batch, num_classes]``.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        match self {
            Self::ResNet(model) => model.forward(input),
            Self::Vgg(model) => model.forward(input),
            Self::AlexNet(model) => model.forward(input),
            Self::SqueezeNet(model) => model.forward(input),
            Self::DenseNet(model) => model.forward(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vgg::VggFeature;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;

    #[test]
    fn test_from_name() {
        let config = ZooConfig::from_name("resnet50").unwrap();
        assert_eq!(config.family(), "resnet");
        assert_eq!(config.num_classes(), 1000);
        match &config {
            ZooConfig::ResNet(resnet) => assert_eq!(resnet.depth(), 50),
            _ => panic!("Expected a resnet"),
        }

        assert_eq!(
            ZooConfig::from_name("resnet51").unwrap_err(),
            ZooError::unknown_model("resnet51")
        );
    }

    #[test]
    fn test_with_num_classes() {
        for name in ["vgg11", "alexnet", "squeezenet1_1", "densenet121", "resnet18"] {
            let config = ZooConfig::from_name(name)
                .unwrap()
                .with_num_classes(7)
                .with_in_channels(1);
            assert_eq!(config.num_classes(), 7, "{name}");
            assert_eq!(config.in_channels(), 1, "{name}");
        }
    }

    #[test]
    fn test_try_validate() {
        ZooConfig::from_name("densenet201")
            .unwrap()
            .try_validate()
            .unwrap();

        let config: ZooConfig = VggAbstractConfig::new(vec![VggFeature::Pool]).into();
        assert_eq!(
            config.try_validate(),
            Err(ZooError::invalid_config("no conv layers"))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = ZooConfig::from_name("squeezenet1_0")
            .unwrap()
            .with_num_classes(12);

        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("zoo.json");
        config.save(&path).unwrap();

        let loaded = ZooConfig::load(&path).unwrap();
        assert_eq!(loaded.family(), "squeezenet");
        assert_eq!(loaded.num_classes(), 12);
    }

    #[test]
    fn test_zoo_model_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ZooModel<B> = ZooConfig::from_name("squeezenet1_1")
            .unwrap()
            .with_num_classes(4)
            .with_in_channels(2)
            .init(&device);
        assert!(matches!(model, ZooModel::SqueezeNet(_)));
        assert_eq!(model.in_channels(), 2);
        assert_eq!(model.num_classes(), 4);

        let output = model.forward(Tensor::ones([1, 2, 48, 48], &device));
        assert_shape_contract!(
            ["batch", "classes"],
            &output,
            &[("batch", 1), ("classes", 4)],
        );
    }

    #[test]
    fn test_try_validate_reports_invalid_config() {
        let config: ZooConfig = DenseNetAbstractConfig::densenet121(10)
            .with_normalization(burn::nn::GroupNormConfig::new(3, 0).into())
            .into();
        assert!(matches!(
            config.try_validate(),
            Err(ZooError::InvalidConfig(_))
        ));

        let config: ZooConfig = DenseNetAbstractConfig::new(8, 4, vec![1, 1])
            .with_drop_rate(2.0)
            .into();
        assert!(matches!(
            config.try_validate(),
            Err(ZooError::InvalidConfig(_))
        ));

        let config: ZooConfig =
            ResNetAbstractConfig::new(crate::models::resnet::BlockKind::Bottleneck, [1, 1, 1, 1])
                .with_groups(0)
                .into();
        assert_eq!(
            config.try_validate(),
            Err(ZooError::invalid_config(
                "stages[0]: groups and width_per_group must be positive"
            ))
        );
    }
}
