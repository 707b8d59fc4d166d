//! # `ConvNorm2d` Block
//!
//! A [`Conv2d`], a [`Normalization`], and an optional `ReLU`.
//!
//! [`ConvNorm2d::forward_residual`] adds a residual after the norm and before
//! the `ReLU`, which is where residual networks merge their skip connections.

use crate::layers::norm::{Normalization, NormalizationConfig};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::Relu;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::{Backend, Tensor};

/// [`ConvNorm2d`] Config.
#[derive(Config, Debug)]
pub struct ConvNorm2dConfig {
    /// The conv config.
    pub conv: Conv2dConfig,

    /// The norm policy; the feature size is matched to the conv on init.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,

    /// Apply a trailing `ReLU`.
    #[config(default = true)]
    pub relu: bool,
}

impl From<Conv2dConfig> for ConvNorm2dConfig {
    fn from(conv: Conv2dConfig) -> Self {
        Self::new(conv)
    }
}

impl ConvNorm2dConfig {
    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.conv.channels[0]
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.conv.channels[1]
    }

    /// The (square) conv stride.
    pub fn stride(&self) -> usize {
        self.conv.stride[0]
    }

    /// Check the norm policy fits the conv output.
    pub fn try_validate(&self) -> Result<(), String> {
        self.norm.try_validate_features(self.out_channels())
    }

    /// Initialize a [`ConvNorm2d`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ConvNorm2d<B> {
        ConvNorm2d {
            conv: self.conv.init(device),
            norm: self
                .norm
                .clone()
                .with_num_features(self.out_channels())
                .init(device),
            act: self.relu.then_some(Relu),
        }
    }
}

/// Conv, norm, and optional `ReLU`.
#[derive(Module, Debug)]
pub struct ConvNorm2d<B: Backend> {
    /// Conv layer.
    pub conv: Conv2d<B>,

    /// Norm layer.
    pub norm: Normalization<B>,

    /// Optional activation.
    pub act: Option<Relu>,
}

impl<B: Backend> ConvNorm2d<B> {
    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.conv.weight.dims()[1] * self.conv.groups
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.conv.weight.dims()[0]
    }

    /// The (square) conv stride.
    pub fn stride(&self) -> usize {
        self.conv.stride[0]
    }

    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.forward_residual(input, None)
    }

    /// Forward Pass, adding `residual` between the norm and the `ReLU`.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, in_height, in_width]``.
    /// - `residual`: ``[batch, out_channels, out_height, out_width]``, if any.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, out_height, out_width]``
    pub fn forward_residual(
        &self,
        input: Tensor<B, 4>,
        residual: Option<Tensor<B, 4>>,
    ) -> Tensor<B, 4> {
        let [batch] = unpack_shape_contract!(
            ["batch", "in_channels", "in_height", "in_width"],
            &input,
            &["batch"],
            &[("in_channels", self.in_channels())]
        );

        let x = self.norm.forward(self.conv.forward(input));
        let x = match residual {
            Some(residual) => x + residual,
            None => x,
        };
        let x = match &self.act {
            Some(act) => act.forward(x),
            None => x,
        };

        assert_shape_contract_periodically!(
            ["batch", "out_channels", "out_height", "out_width"],
            &x,
            &[("batch", batch), ("out_channels", self.out_channels())]
        );

        x
    }

    /// Zero the scale of the norm layer.
    pub fn zero_init_norm(&mut self) {
        self.norm.zero_init_scale();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;
    use burn::nn::PaddingConfig2d;
    use burn::nn::InstanceNormConfig;

    #[test]
    fn test_conv_norm_config() {
        let config: ConvNorm2dConfig = Conv2dConfig::new([2, 4], [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .into();

        assert_eq!(config.in_channels(), 2);
        assert_eq!(config.out_channels(), 4);
        assert_eq!(config.stride(), 2);
        assert!(config.relu);
        assert!(matches!(config.norm, NormalizationConfig::Batch(_)));
    }

    #[test]
    fn test_conv_norm_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let layer: ConvNorm2d<B> = ConvNorm2dConfig::new(
            Conv2dConfig::new([2, 6], [1, 1])
                .with_stride([2, 2])
                .with_bias(false),
        )
        .with_norm(InstanceNormConfig::new(0).into())
        .init(&device);

        assert_eq!(layer.in_channels(), 2);
        assert_eq!(layer.out_channels(), 6);
        assert_eq!(layer.stride(), 2);
        assert_eq!(layer.norm.num_features(), 6);

        let output = layer.forward(Tensor::ones([3, 2, 8, 7], &device));
        assert_shape_contract!(
            ["batch", "channels", "height", "width"],
            &output,
            &[("batch", 3), ("channels", 6), ("height", 4), ("width", 4)],
        );
    }

    #[test]
    fn test_forward_residual() {
        type B = NdArray<f32>;
        let device = Default::default();

        let mut layer: ConvNorm2d<B> =
            ConvNorm2dConfig::new(Conv2dConfig::new([3, 3], [1, 1])).init(&device);
        layer.zero_init_norm();

        // With a zero norm scale, the conv branch vanishes and only the residual remains.
        let input: Tensor<B, 4> = Tensor::ones([1, 3, 2, 2], &device);
        let residual: Tensor<B, 4> = Tensor::from_data(
            [[
                [[1.0, -1.0], [2.0, -2.0]],
                [[0.5, 0.0], [0.0, 0.5]],
                [[-3.0, 3.0], [1.0, 1.0]],
            ]],
            &device,
        );
        let expected = residual.clone().clamp_min(0.0);

        let output = layer.forward_residual(input.clone(), Some(residual.clone()));
        output.to_data().assert_eq(&expected.to_data(), true);

        let no_relu: ConvNorm2d<B> = ConvNorm2dConfig::new(Conv2dConfig::new([3, 3], [1, 1]))
            .with_relu(false)
            .init(&device);
        assert!(no_relu.act.is_none());
    }
}
