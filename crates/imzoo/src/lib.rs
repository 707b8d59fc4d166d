#![warn(missing_docs)]
//!# imzoo - Burn Image Model Zoo
//!
//! Name-indexed factories for the classic image classification families,
//! built from ``burn::nn`` layers.
//!
//! ## Notable Components
//!
//! * [`layers`] - reusable neural network modules.
//!   * [`layers::norm::Normalization`] - batch / group / instance norm selection.
//!   * [`layers::blocks`] - miscellaneous blocks.
//!     * [`layers::blocks::conv_norm`] - ``Conv2d + Norm (+ ReLU)`` block.
//!     * [`layers::blocks::feature_stack`] - ``Conv2d + ReLU`` / pool stacks.
//!   * [`layers::pool`] - selectable max / average pooling.
//! * [`models`] - complete model families.
//!   * [`models::alexnet`] - `AlexNet`
//!   * [`models::densenet`] - `DenseNet`
//!   * [`models::resnet`] - `ResNet`
//!   * [`models::squeezenet`] - `SqueezeNet`
//!   * [`models::vgg`] - `VGG`
//! * [`zoo`] - the name-indexed model registry.

extern crate core;
/// Test-only macro import.
#[cfg(test)]
#[allow(unused_imports)]
#[macro_use]
extern crate hamcrest;

pub mod errors;
pub mod layers;
pub mod models;
pub mod utility;
pub mod zoo;
