use thiserror::Error;

/// Errors that can occur while collecting pool data
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to spawn `{command}`: {source}")]
    SubprocessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` produced output that is not valid UTF-8")]
    UnreadableOutput { command: String },

    #[error("`{command}` produced no data rows")]
    EmptyOutput { command: String },
}

impl CollectorError {
    /// True for failures of the subprocess itself (missing executable,
    /// non-zero exit, unreadable output), as opposed to empty output.
    pub fn is_command_error(&self) -> bool {
        !matches!(self, CollectorError::EmptyOutput { .. })
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors returned by report collaborators
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to format report: {0}")]
    Format(String),

    #[error("Failed to deliver report: {0}")]
    Delivery(String),
}
