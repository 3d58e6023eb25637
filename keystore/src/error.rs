use pqc_types::ErrorCode;
use thiserror::Error;

/// Errors produced by the keystore.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("incorrect master password")]
    BadPassword,

    #[error("key '{0}' not found")]
    NotFound(String),

    #[error("key '{0}' is corrupt: {1}")]
    Corrupt(String, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Crypto(#[from] pqc_crypto::CryptoError),
}

impl KeystoreError {
    /// Map to a platform error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            KeystoreError::BadInput(_) => ErrorCode::BadInput,
            KeystoreError::BadPassword => ErrorCode::BadPassword,
            KeystoreError::NotFound(_) => ErrorCode::BadInput,
            KeystoreError::Corrupt(..) => ErrorCode::StoreCorrupt,
            KeystoreError::Io(_) => ErrorCode::Internal,
            KeystoreError::Serde(_) => ErrorCode::StoreCorrupt,
            KeystoreError::Crypto(e) => e.error_code(),
        }
    }
}

pub type KeystoreResult<T> = Result<T, KeystoreError>;
