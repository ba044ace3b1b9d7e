use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate settings, tuning or material tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to build a track scene from collider definitions.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("collider {id} has an invalid triangle mesh: {reason}")]
    InvalidMesh { id: u32, reason: String },
    #[error("collider id {0} is defined more than once")]
    DuplicateId(u32),
    #[error("collider {id} has a non-finite transform or shape")]
    NonFinite { id: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("kart {0:#018x} was removed or never existed")]
    StaleKart(u64),
}
