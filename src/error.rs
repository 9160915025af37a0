//! Crate level errors.
//!
//! Only construction and the scrape surface can fail. Event handlers never
//! return errors: transport failures reported by the client are data and end
//! up as counter increments, not as `Error` values.
//!
//! # Error Kinds
//!
//! - [`Error::Metric`]: invalid metric name or a registration collision.
//!   Fatal at construction, the embedding process should fail fast.
//! - [`Error::Config`]: unparsable configuration values.
//! - [`Error::Io`]: binding or serving the metrics endpoint.
//! - [`Error::Encode`]: text exposition failed.

use std::{io, result};

use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Metric construction or registration failed.
    ///
    /// `prometheus::Error::AlreadyReg` means a family with the same
    /// fully-qualified name is already in the registry.
    #[error("Metric error: {0}")]
    Metric(#[from] prometheus::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error in the network.
    #[error("IO error: {0:?}")]
    Io(io::ErrorKind),

    /// Encoding gathered families failed.
    #[error("Encoding error: {0}")]
    Encode(String),
}

impl Error {
    /// Returns true if this error is a duplicate registration.
    pub fn is_already_registered(&self) -> bool {
        matches!(self, Error::Metric(prometheus::Error::AlreadyReg))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_detection() {
        let err = Error::from(prometheus::Error::AlreadyReg);
        assert!(err.is_already_registered());
        assert!(!Error::Config("x".to_string()).is_already_registered());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, Error::Io(io::ErrorKind::AddrInUse)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Config("bad timeout".to_string()).to_string(),
            "Configuration error: bad timeout"
        );
        assert!(Error::Encode("utf8".to_string()).to_string().contains("utf8"));
    }
}
