use thiserror::Error;

/// Errors raised by the per-frame detection core.
///
/// `Configuration` is raised when thresholds, bounds or frame geometry are
/// contradictory. `InvalidInput` is raised per call for frames or masks that
/// cannot be processed. `InternalInvariant` signals a bug in the core, never a
/// recoverable runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SentinelError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl SentinelError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalInvariant(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration in {path}")]
    Invalid {
        path: String,
        #[source]
        source: SentinelError,
    },

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine a platform config directory")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open frame source: {path}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode frame {path}")]
    DecodeFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Decoded frame {path} is unusable")]
    InvalidFrame {
        path: String,
        #[source]
        source: SentinelError,
    },

    #[error("Frame source contains no frames: {0}")]
    Empty(String),

    #[error("Frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
