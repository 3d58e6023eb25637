use pqc_types::ErrorCode;
use thiserror::Error;

/// Errors produced by the hybrid KEM and session KDF.
///
/// Note that ML-KEM decapsulation against a tampered or foreign ciphertext
/// does **not** raise an error here -- per FIPS 203 it deterministically
/// returns the implicit-rejection secret. `Decapsulation` below is reserved
/// for malformed inputs (wrong-length keys/ciphertexts) that can be rejected
/// before reaching the PQC primitive.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed for {algorithm}: {reason}")]
    KeyGeneration { algorithm: String, reason: String },

    #[error("encapsulation failed: {0}")]
    Encapsulation(String),

    #[error("decapsulation failed: {0}")]
    Decapsulation(String),

    #[error("algorithm mismatch: encapsulated key uses {encap}, secret key uses {own}")]
    AlgMismatch { encap: String, own: String },

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),
}

impl CryptoError {
    /// Map to a platform error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CryptoError::KeyGeneration { .. } => ErrorCode::KeyGen,
            CryptoError::AlgMismatch { .. } => ErrorCode::AlgMismatch,
            CryptoError::Encapsulation(_)
            | CryptoError::Decapsulation(_)
            | CryptoError::InvalidKeyMaterial(_) => ErrorCode::BadInput,
            CryptoError::Kdf(_) => ErrorCode::Internal,
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
