//! # Config Prefabs
//!
//! A prefab is a well-known config under a unique name.
//!
//! [`StaticPreFabConfig`] holds a builder `fn`, so prefab tables can live in
//! `static`s; [`PreFabConfig`] is the materialized, editable form.

use burn::config::Config;
use std::fmt::{Debug, Formatter};

/// A named config builder, usable in `static` tables.
pub struct StaticPreFabConfig<C: Config> {
    /// Unique name of the prefab.
    pub name: &'static str,

    /// Human-readable description.
    pub description: &'static str,

    /// Builds the config.
    pub builder: fn() -> C,
}

impl<C: Config> StaticPreFabConfig<C> {
    /// Build a fresh config.
    pub fn new_config(&self) -> C {
        (self.builder)()
    }

    /// Materialize as a [`PreFabConfig`].
    pub fn to_prefab(&self) -> PreFabConfig<C> {
        PreFabConfig {
            name: self.name.to_string(),
            description: self.description.to_string(),
            config: self.new_config(),
        }
    }
}

impl<C: Config> From<&StaticPreFabConfig<C>> for PreFabConfig<C> {
    fn from(prefab: &StaticPreFabConfig<C>) -> Self {
        prefab.to_prefab()
    }
}

impl<C: Config + Debug> Debug for StaticPreFabConfig<C> {
    /// `{:?}` shows the name and description; `{:#?}` adds the built config.
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        let pretty = f.alternate();
        let mut out = f.debug_struct("StaticPreFabConfig");
        out.field("name", &self.name)
            .field("description", &self.description);
        if pretty {
            out.field("config", &self.new_config());
        }
        out.finish()
    }
}

/// A named config.
#[derive(Debug, Clone)]
pub struct PreFabConfig<C: Config> {
    /// Unique name of the prefab.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// The config.
    pub config: C,
}

impl<C: Config + Clone> PreFabConfig<C> {
    /// A copy of the config.
    pub fn new_config(&self) -> C {
        self.config.clone()
    }

    /// Rename the prefab and edit its config.
    pub fn map(
        self,
        name: impl Into<String>,
        edit: impl FnOnce(C) -> C,
    ) -> Self {
        Self {
            name: name.into(),
            description: self.description,
            config: edit(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resnet::{BlockKind, ResNetAbstractConfig};

    static TINY: StaticPreFabConfig<ResNetAbstractConfig> = StaticPreFabConfig {
        name: "tiny",
        description: "one block per stage",
        builder: || ResNetAbstractConfig::new(BlockKind::Basic, [1, 1, 1, 1]),
    };

    #[test]
    fn test_static_prefab() {
        assert_eq!(TINY.new_config().layers, [1, 1, 1, 1]);

        let prefab: PreFabConfig<_> = (&TINY).into();
        assert_eq!(prefab.name, "tiny");
        assert_eq!(prefab.description, "one block per stage");
        assert_eq!(prefab.new_config().block, BlockKind::Basic);
    }

    #[test]
    fn test_static_prefab_debug() {
        let short = format!("{TINY:?}");
        assert!(short.contains("\"tiny\""));
        assert!(!short.contains("layers"));

        let pretty = format!("{TINY:#?}");
        assert!(pretty.contains("layers"));
    }

    #[test]
    fn test_prefab_map() {
        let prefab = TINY
            .to_prefab()
            .map("tiny_10", |config| config.with_num_classes(10));
        assert_eq!(prefab.name, "tiny_10");
        assert_eq!(prefab.description, "one block per stage");
        assert_eq!(prefab.config.num_classes, 10);
        assert_eq!(TINY.new_config().num_classes, 1000);
    }
}
