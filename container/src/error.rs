use pqc_types::ErrorCode;
use thiserror::Error;

/// Errors produced by the chunked AEAD container codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("chunk authentication failed at index {index}")]
    AuthFailed { index: u32 },

    #[error("nonce mismatch at index {index}: expected {expected}, got {got}")]
    NonceMismatch { index: u32, expected: u32, got: u32 },

    #[error("trailer digest mismatch: stream contents do not match the recorded digest")]
    DigestMismatch,

    #[error("stream truncated: {0}")]
    Truncated(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Map to a platform error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CodecError::BadInput(_) => ErrorCode::BadInput,
            CodecError::AuthFailed { .. } => ErrorCode::AuthFailed,
            CodecError::NonceMismatch { .. } => ErrorCode::NonceMismatch,
            CodecError::DigestMismatch => ErrorCode::DigestMismatch,
            CodecError::Truncated(_) => ErrorCode::Truncated,
            CodecError::Io(_) => ErrorCode::Truncated,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
