//! # Model Zoo
//!
//! Name-indexed access to the published model families.
//!
//! * [`registry`] - the named prefabs, plus [`build_model`].
//! * [`factory`] - depth-indexed family constructors.
//! * [`zoo_config`] - the family-agnostic [`ZooConfig`] and [`ZooModel`].

pub mod factory;
pub mod prefabs;
pub mod registry;
pub mod zoo_config;

pub use factory::{create_densenet, create_resnet, create_vgg};
pub use registry::{build_model, lookup_prefab, prefab_names};
pub use zoo_config::{ZooConfig, ZooModel};
