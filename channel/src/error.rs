use pqc_container::CodecError;
use pqc_crypto::CryptoError;
use pqc_types::ErrorCode;
use thiserror::Error;

/// Errors produced by the handshake and data-phase framing.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("suite negotiation failed: {0}")]
    Negotiation(String),

    #[error("handshake confirmation failed")]
    HandshakeAuthFailed,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("handshake or chunk timed out")]
    Timeout,

    #[error("session cancelled")]
    Cancelled,

    #[error("transport closed unexpectedly")]
    TransportClosed,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ChannelError {
    /// Map to a platform error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ChannelError::BadInput(_) => ErrorCode::BadInput,
            ChannelError::Negotiation(_) => ErrorCode::Negotiation,
            ChannelError::HandshakeAuthFailed => ErrorCode::HandshakeAuthFailed,
            ChannelError::Protocol(_) => ErrorCode::BadInput,
            ChannelError::Timeout => ErrorCode::Timeout,
            ChannelError::Cancelled => ErrorCode::Cancelled,
            ChannelError::TransportClosed => ErrorCode::TransportClosed,
            ChannelError::Crypto(e) => e.error_code(),
            ChannelError::Codec(e) => e.error_code(),
        }
    }
}

pub type ChannelResult<T> = Result<T, ChannelError>;
