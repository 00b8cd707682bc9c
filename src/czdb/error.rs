//! Custom error types for the czdb-reader crate.

use std::sync::Arc;
use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// The enum is `Clone` because a failed initialization is cached and replayed
/// verbatim to every subsequent `find` call.
#[derive(Debug, Clone, Error)]
pub enum CzdbError {
    /// An error originating from I/O operations while loading the file.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// A lookup was attempted before a decryption key was supplied.
    #[error("decryption key required, call set_key() before find()")]
    KeyRequired,

    /// The key is not decodable base64, or decodes to an unsupported width.
    #[error("invalid decryption key: {0}")]
    InvalidKey(String),

    /// The database image is structurally invalid: truncated regions,
    /// malformed padding, out-of-range pointers, or a lookup miss outside
    /// the documented coverage gaps.
    #[error("invalid database: {0}")]
    InvalidDatabase(String),

    /// MessagePack decoding failed inside a record or a dictionary entry.
    #[error("record decode failed: {0}")]
    DecodeError(String),
}

impl From<std::io::Error> for CzdbError {
    fn from(err: std::io::Error) -> Self {
        CzdbError::Io(Arc::new(err))
    }
}

impl From<base64::DecodeError> for CzdbError {
    fn from(err: base64::DecodeError) -> Self {
        CzdbError::InvalidKey(err.to_string())
    }
}

impl From<rmpv::decode::Error> for CzdbError {
    fn from(err: rmpv::decode::Error) -> Self {
        CzdbError::DecodeError(err.to_string())
    }
}

/// A convenience `Result` type alias using the crate's `CzdbError` type.
pub type Result<T> = std::result::Result<T, CzdbError>;
