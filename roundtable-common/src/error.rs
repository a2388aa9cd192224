//! Common error types for roundtable

use thiserror::Error;

/// Common result type for roundtable operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the roundtable crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration file
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::InvalidInput("bad id".to_string()).to_string(),
            "Invalid input: bad id"
        );
        assert_eq!(
            Error::Config("event_capacity must be greater than 0".to_string()).to_string(),
            "Configuration error: event_capacity must be greater than 0"
        );

        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, Error::Io(_)));
    }
}
