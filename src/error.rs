use std::fmt;
use std::io;

use thiserror::Error;

/// Exception payload sent by the server. Codes round-trip unchanged so
/// callers can match on ClickHouse error numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerException {
    pub code: i32,
    pub name: String,
    pub message: String,
    pub stack_trace: String,
    pub nested: Option<Box<ServerException>>,
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.code, self.message)?;
        if let Some(nested) = &self.nested {
            write!(f, "; caused by: {nested}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerException {}

#[derive(Debug, Error)]
pub enum Error {
    /// The server sent an opcode or field inconsistent with the negotiated
    /// revision. The session is unusable afterwards.
    #[error("unexpected server response: {0}")]
    UnexpectedResponse(String),

    #[error("malformed type name `{name}`: {reason}")]
    MalformedTypeName { name: String, reason: String },

    #[error("type `{0}` is not supported")]
    TypeNotSupported(String),

    #[error("type `{0}` is not fully specified")]
    TypeNotFullySpecified(String),

    #[error("value `{value}` out of range for {ty}")]
    Overflow { ty: String, value: String },

    #[error("internal driver error: {0}")]
    Internal(String),

    #[error("corrupt compressed frame: {0}")]
    Compression(String),

    #[error(
        "block checksum mismatch: expected {expected_lo:016x}{expected_hi:016x}, \
         computed {actual_lo:016x}{actual_hi:016x}"
    )]
    ChecksumMismatch {
        expected_lo: u64,
        expected_hi: u64,
        actual_lo: u64,
        actual_hi: u64,
    },

    #[error("server exception: {0}")]
    Server(#[from] ServerException),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Whether the session must transition to `Broken`. Caller-attributable
    /// errors (bad type, bad parameter, server-side exceptions) leave the
    /// connection usable; protocol and transport failures do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedResponse(_)
                | Error::Internal(_)
                | Error::Compression(_)
                | Error::ChecksumMismatch { .. }
                | Error::Io(_)
                | Error::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
