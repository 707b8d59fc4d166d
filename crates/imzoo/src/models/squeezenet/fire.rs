//! # `SqueezeNet` Fire Module

use crate::utility::init::{CONV_UNIFORM_INITIALIZER, zero_conv2d_bias};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::{Backend, Tensor};

/// [`Fire`] Meta.
pub trait FireMeta {
    /// Number of input channels.
    fn in_channels(&self) -> usize;

    /// Number of squeeze channels.
    fn squeeze_channels(&self) -> usize;

    /// Number of ``1x1`` expand channels.
    fn expand1x1_channels(&self) -> usize;

    /// Number of ``3x3`` expand channels.
    fn expand3x3_channels(&self) -> usize;

    /// Number of output channels.
    fn out_channels(&self) -> usize {
        self.expand1x1_channels() + self.expand3x3_channels()
    }
}

/// [`Fire`] Config.
#[derive(Config, Debug)]
pub struct FireConfig {
    /// Number of input channels.
    pub in_channels: usize,

    /// Number of squeeze channels.
    pub squeeze_channels: usize,

    /// Number of ``1x1`` expand channels.
    pub expand1x1_channels: usize,

    /// Number of ``3x3`` expand channels.
    pub expand3x3_channels: usize,
}

impl FireMeta for FireConfig {
    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn squeeze_channels(&self) -> usize {
        self.squeeze_channels
    }

    fn expand1x1_channels(&self) -> usize {
        self.expand1x1_channels
    }

    fn expand3x3_channels(&self) -> usize {
        self.expand3x3_channels
    }
}

impl FireConfig {
    /// Initialize a [`Fire`] module.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Fire<B> {
        let conv = |channels: [usize; 2], kernel: usize, padding: usize| {
            zero_conv2d_bias(
                Conv2dConfig::new(channels, [kernel, kernel])
                    .with_padding(PaddingConfig2d::Explicit(padding, padding))
                    .with_initializer(CONV_UNIFORM_INITIALIZER)
                    .init(device),
            )
        };

        Fire {
            squeeze: conv([self.in_channels, self.squeeze_channels], 1, 0),
            expand1x1: conv([self.squeeze_channels, self.expand1x1_channels], 1, 0),
            expand3x3: conv([self.squeeze_channels, self.expand3x3_channels], 3, 1),
            act: Relu,
        }
    }
}

/// Fire module.
///
/// A ``1x1`` squeeze conv, then parallel ``1x1`` and ``3x3`` expand convs
/// concatenated on the channel axis; each conv is followed by a `ReLU`.
#[derive(Module, Debug)]
pub struct Fire<B: Backend> {
    /// Squeeze conv.
    pub squeeze: Conv2d<B>,

    /// ``1x1`` expand conv.
    pub expand1x1: Conv2d<B>,

    /// ``3x3`` expand conv.
    pub expand3x3: Conv2d<B>,

    /// Activation.
    pub act: Relu,
}

impl<B: Backend> FireMeta for Fire<B> {
    fn in_channels(&self) -> usize {
        self.squeeze.weight.dims()[1]
    }

    fn squeeze_channels(&self) -> usize {
        self.squeeze.weight.dims()[0]
    }

    fn expand1x1_channels(&self) -> usize {
        self.expand1x1.weight.dims()[0]
    }

    fn expand3x3_channels(&self) -> usize {
        self.expand3x3.weight.dims()[0]
    }
}

impl<B: Backend> Fire<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, height, width]``.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, height, width] = unpack_shape_contract!(
            ["batch", "in_channels", "height", "width"],
            &input,
            &["batch", "height", "width"],
            &[("in_channels", self.in_channels())]
        );

        let x = self.act.forward(self.squeeze.forward(input));
        let x = Tensor::cat(
            vec![
                self.act.forward(self.expand1x1.forward(x.clone())),
                self.act.forward(self.expand3x3.forward(x)),
            ],
            1,
        );

        assert_shape_contract_periodically!(
            ["batch", "out_channels", "height", "width"],
            &x,
            &[
                ("batch", batch),
                ("out_channels", self.out_channels()),
                ("height", height),
                ("width", width)
            ]
        );

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;

    #[test]
    fn test_fire_config() {
        let config = FireConfig::new(96, 16, 64, 64);
        assert_eq!(config.in_channels(), 96);
        assert_eq!(config.squeeze_channels(), 16);
        assert_eq!(config.out_channels(), 128);
    }

    #[test]
    fn test_fire_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let fire: Fire<B> = FireConfig::new(6, 2, 3, 5).init(&device);
        assert_eq!(fire.in_channels(), 6);
        assert_eq!(fire.squeeze_channels(), 2);
        assert_eq!(fire.expand1x1_channels(), 3);
        assert_eq!(fire.expand3x3_channels(), 5);
        assert_eq!(fire.out_channels(), 8);

        let bias: f32 = fire
            .expand3x3
            .bias
            .clone()
            .unwrap()
            .val()
            .abs()
            .sum()
            .into_scalar();
        assert_eq!(bias, 0.0);

        let output = fire.forward(Tensor::ones([2, 6, 7, 5], &device));
        assert_shape_contract!(
            ["batch", "channels", "height", "width"],
            &output,
            &[("batch", 2), ("channels", 8), ("height", 7), ("width", 5)],
        );
    }
}
