use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading, configuring and driving abilities.
#[derive(Debug, Error)]
pub enum AbilityError {
    #[error("Ability type not registered: {0}")]
    UnknownType(String),

    #[error("Ability already loaded: {0}")]
    DuplicateName(String),

    #[error("Ability not found: {0}")]
    NotFound(String),

    #[error("Invalid config for ability '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("Failed to initialize ability '{name}': {reason}")]
    InitFailed { name: String, reason: String },

    #[error("Ability '{0}' has stopped and cannot be restarted")]
    Terminated(String),

    #[error("Failed to spawn thread for ability '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to robot at: {0}")]
    RobotInit(String),

    #[error("Failed to read system config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse system config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
