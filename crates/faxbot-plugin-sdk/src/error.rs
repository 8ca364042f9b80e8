use thiserror::Error;

/// Failures a plugin can surface to the host runtime.
#[derive(Debug, Error)]
pub enum PluginError {
    /// `validate_config` rejected the supplied configuration.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// `initialize` could not acquire a resource.
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend does not provide an optional capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// Credentials were rejected or a refresh token is invalid or expired.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PluginError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        Self::Unsupported(op.into())
    }
}

pub type PluginResult<T> = std::result::Result<T, PluginError>;
