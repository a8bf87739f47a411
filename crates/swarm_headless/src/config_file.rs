//! Engine configuration loaded from RON files.

use std::path::Path;

use swarm_core::config::EngineConfig;
use swarm_core::error::EngineError;
use thiserror::Error;

/// Error type for config file operations.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse config RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// Parsed but inconsistent.
    #[error(transparent)]
    Invalid(#[from] EngineError),
}

/// Load and validate a config file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigFileError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let mut config: EngineConfig = ron::from_str(&contents)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), "Loaded engine config");
    Ok(config)
}

/// Resolve the session config from the command line.
///
/// Without a path the defaults are used. `seed` overrides whatever the file
/// says.
pub fn resolve(path: Option<&Path>, seed: Option<u64>) -> Result<EngineConfig, ConfigFileError> {
    let mut config = match path {
        Some(path) => load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    Ok(config)
}
