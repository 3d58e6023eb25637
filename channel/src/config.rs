use pqc_container::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use pqc_types::{AeadAlg, PqcAlg, Suite};
use std::time::Duration;
use thiserror::Error;

/// Tunable parameters for one secure-channel session: the suite both sides
/// must negotiate plus the timeouts and chunk size that govern it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub suite: Suite,
    pub chunk_size: u32,
    pub handshake_timeout: Duration,
    pub chunk_inactivity_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            suite: Suite { pqc_alg: PqcAlg::MlKem768, aead_alg: AeadAlg::Aes256Gcm },
            chunk_size: pqc_container::DEFAULT_CHUNK_SIZE,
            handshake_timeout: Duration::from_secs(30),
            chunk_inactivity_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionConfigError {
    #[error("chunk_size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}, got {0}")]
    ChunkSizeOutOfRange(u32),
    #[error("handshake_timeout must be greater than zero")]
    ZeroHandshakeTimeout,
    #[error("chunk_inactivity_timeout must be greater than zero")]
    ZeroChunkTimeout,
}

impl SessionConfig {
    /// Validate that the configuration is self-consistent.
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(SessionConfigError::ChunkSizeOutOfRange(self.chunk_size));
        }
        if self.handshake_timeout.is_zero() {
            return Err(SessionConfigError::ZeroHandshakeTimeout);
        }
        if self.chunk_inactivity_timeout.is_zero() {
            return Err(SessionConfigError::ZeroChunkTimeout);
        }
        Ok(())
    }
}
