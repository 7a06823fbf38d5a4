//! Crate error type

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An asset could not be loaded or decoded by the provider
    AssetLoad { key: String, reason: String },
    /// Level numbers are 1, 2 or 3
    UnknownLevel(u8),
    /// Tuning or settings JSON was malformed
    Config(serde_json::Error),
    /// The rigid-body backend refused an operation
    Physics(String),
    /// Reading a configuration file failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetLoad { key, reason } => write!(f, "failed to load asset `{key}`: {reason}"),
            Self::UnknownLevel(n) => write!(f, "unknown level {n} (expected 1..=3)"),
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Physics(msg) => write!(f, "physics backend error: {msg}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
