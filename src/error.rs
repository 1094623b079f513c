use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockerdError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Domain errors raised by the locker registry.
///
/// `NotFound` is the only domain error in the system: it is never retried
/// and always surfaces to the caller as-is. An empty dispatch queue is not
/// an error and is represented as `None` by the service.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Locker not found: {id}")]
    NotFound { id: u32 },
}

/// Errors raised while starting or running the HTTP server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server startup failed: {details}")]
    StartupFailed { details: String },
}

pub type Result<T> = std::result::Result<T, LockerdError>;
