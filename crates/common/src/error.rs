//! Error type for the shared setup code

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A setting could not be used as given
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("Invalid log filter: nope".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: Invalid log filter: nope");

        let err = Error::Logging("subscriber already set".to_string());
        assert!(err.to_string().starts_with("Logging setup failed: "));
    }
}
