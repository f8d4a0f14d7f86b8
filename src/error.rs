use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid key bindings: {0}")]
    InvalidKeys(String),

    #[error("Sprite {0:?} is empty")]
    EmptySprite(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
