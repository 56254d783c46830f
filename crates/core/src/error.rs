use thiserror::Error;

/// Errors that can occur while planning in an MDP
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MdpError {
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Malformed transition: {0}")]
    MalformedTransition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),
}

/// Convenience Result type for MDP operations
pub type Result<T> = std::result::Result<T, MdpError>;
