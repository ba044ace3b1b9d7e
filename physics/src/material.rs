//! Terrain material classification.
//!
//! The table is filled once when a track loads (from code or from a TOML
//! `[[material]]` list) and is read-only afterwards. It is passed by reference to
//! the terrain query and the integrator. Lookups never fail: unknown tags get the
//! default material (driveable, friction 1.0, no special behavior).

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    flags::FlagSet,
};

/// Identifier a scene attaches to each surface.
pub type MaterialTag = u32;

crate::define_flags!(
    /// Gameplay properties of a material.
    MaterialFlag, u8, {
        /// Not solid: karts pass through it and never stand on it (decoration).
        Ignore,
        /// Grants a short speed boost when first driven onto.
        Zipper,
        /// Touching it requests a rescue.
        Reset,
        /// Hitting it fast crashes the kart.
        Crash,
    }
);

pub type MaterialFlags = FlagSet<MaterialFlag>;

/// Result of a material lookup, as consumed by the terrain query and the integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub driveable: bool,
    pub ignorable: bool,
    pub friction_coefficient: f32,
    pub is_zipper: bool,
    pub is_reset_trigger: bool,
    pub is_crash_trigger: bool,
}

impl Default for Classification {
    fn default() -> Self {
        Material::default().classification()
    }
}

/// One material entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    pub friction: f32,
    pub ignore: bool,
    pub zipper: bool,
    pub reset: bool,
    pub crash: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            friction: 1.0,
            ignore: false,
            zipper: false,
            reset: false,
            crash: false,
        }
    }
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_flag(mut self, flag: MaterialFlag) -> Self {
        match flag {
            MaterialFlag::Ignore => self.ignore = true,
            MaterialFlag::Zipper => self.zipper = true,
            MaterialFlag::Reset => self.reset = true,
            MaterialFlag::Crash => self.crash = true,
        }
        self
    }

    pub fn flags(&self) -> MaterialFlags {
        let mut flags = MaterialFlags::empty();
        flags.set(MaterialFlag::Ignore, self.ignore);
        flags.set(MaterialFlag::Zipper, self.zipper);
        flags.set(MaterialFlag::Reset, self.reset);
        flags.set(MaterialFlag::Crash, self.crash);
        flags
    }

    pub fn classification(&self) -> Classification {
        let flags = self.flags();
        let ignorable = flags.contains(MaterialFlag::Ignore);
        Classification {
            driveable: !ignorable,
            ignorable,
            friction_coefficient: self.friction,
            is_zipper: flags.contains(MaterialFlag::Zipper),
            is_reset_trigger: flags.contains(MaterialFlag::Reset),
            is_crash_trigger: flags.contains(MaterialFlag::Crash),
        }
    }
}

/// TOML layout: a list of `[[material]]` tables, each with a `tag`.
#[derive(Debug, Deserialize)]
struct MaterialFile {
    #[serde(default)]
    material: Vec<TaggedMaterial>,
}

#[derive(Debug, Deserialize)]
struct TaggedMaterial {
    tag: MaterialTag,
    #[serde(flatten)]
    material: Material,
}

/// Read-only material lookup keyed by [`MaterialTag`].
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
    entries: HashMap<MaterialTag, Classification>,
    names: HashMap<MaterialTag, String>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `tag`.
    ///
    /// A friction that is negative or not finite is replaced by 1.0 so that a bad
    /// level file cannot poison the force model.
    pub fn insert(&mut self, tag: MaterialTag, material: Material) {
        let mut classification = material.classification();
        if !(classification.friction_coefficient.is_finite()
            && classification.friction_coefficient >= 0.0)
        {
            log::warn!(
                "material {tag} ({}) has invalid friction {}, using 1.0",
                material.name,
                classification.friction_coefficient
            );
            classification.friction_coefficient = 1.0;
        }
        self.entries.insert(tag, classification);
        self.names.insert(tag, material.name);
    }

    pub fn with(mut self, tag: MaterialTag, material: Material) -> Self {
        self.insert(tag, material);
        self
    }

    /// Look up a material. Unknown tags are fully driveable and non-special.
    #[inline]
    pub fn classify(&self, tag: MaterialTag) -> Classification {
        self.entries.get(&tag).copied().unwrap_or_default()
    }

    #[inline]
    pub fn is_ignorable(&self, tag: MaterialTag) -> bool {
        self.classify(tag).ignorable
    }

    pub fn name(&self, tag: MaterialTag) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a material list.
    ///
    /// ```toml
    /// [[material]]
    /// tag = 7
    /// name = "boost-pad"
    /// zipper = true
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: MaterialFile = toml::from_str(text)?;
        let mut table = Self::new();
        for entry in file.material {
            if table.entries.contains_key(&entry.tag) {
                return Err(ConfigError::Invalid(format!(
                    "material tag {} is defined twice",
                    entry.tag
                )));
            }
            table.insert(entry.tag, entry.material);
        }
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
