//! # Model Families

pub mod alexnet;
pub mod densenet;
pub mod resnet;
pub mod squeezenet;
pub mod vgg;
