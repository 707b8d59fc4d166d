//! # Weight Initialization Utilities
//!
//! The published model families share a small set of init schemes;
//! the constants here are used as `#[config(default)]` values.

use burn::nn::conv::Conv2d;
use burn::nn::{Initializer, Linear};
use burn::prelude::Backend;
use std::f64::consts::SQRT_2;

/// Kaiming-normal, fan-out, `ReLU` gain; for convs feeding into a `ReLU`.
pub const CONV_INTO_RELU_INITIALIZER: Initializer = Initializer::KaimingNormal {
    gain: SQRT_2,
    fan_out_only: true,
};

/// Kaiming-normal, fan-in, `ReLU` gain.
pub const CONV_FAN_IN_INITIALIZER: Initializer = Initializer::KaimingNormal {
    gain: SQRT_2,
    fan_out_only: false,
};

/// Kaiming-uniform, fan-in, `ReLU` gain.
pub const CONV_UNIFORM_INITIALIZER: Initializer = Initializer::KaimingUniform {
    gain: SQRT_2,
    fan_out_only: false,
};

/// ``Normal(0, 0.01)``; for classifier heads.
pub const HEAD_NORMAL_INITIALIZER: Initializer = Initializer::Normal {
    mean: 0.0,
    std: 0.01,
};

/// Zero the bias of a [`Conv2d`], if it has one.
///
/// ``burn`` initializes the bias with the weight initializer;
/// several published inits instead start the bias at zero.
pub fn zero_conv2d_bias<B: Backend>(mut conv: Conv2d<B>) -> Conv2d<B> {
    conv.bias = conv.bias.map(|bias| bias.map(|t| t.zeros_like()));
    conv
}

/// Zero the bias of a [`Linear`], if it has one.
pub fn zero_linear_bias<B: Backend>(mut linear: Linear<B>) -> Linear<B> {
    linear.bias = linear.bias.map(|bias| bias.map(|t| t.zeros_like()));
    linear
}
