use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds shared across the crypto, container, channel, and
/// keystore crates.
///
/// Tier 1 (`BadInput`, `AlgMismatch`, `Negotiation`) is recoverable by
/// the caller. Tiers 2 and 3 are session-fatal: on any of them the
/// session's secrets are zeroized and its transport is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Tier 1: input validation, recoverable.
    BadInput,
    AlgMismatch,
    Negotiation,

    // Tier 2: protocol/crypto faults, session-fatal.
    KeyGen,
    AuthFailed,
    HandshakeAuthFailed,
    NonceMismatch,
    DigestMismatch,
    Truncated,
    BadPassword,
    StoreCorrupt,

    // Tier 3: resource faults, session-fatal but distinguishable.
    Timeout,
    Cancelled,
    TransportClosed,

    // Generic fallback for failures with no more specific kind.
    Internal,
}

impl ErrorCode {
    /// Returns a short string code suitable for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadInput => "BAD_INPUT",
            ErrorCode::AlgMismatch => "ALG_MISMATCH",
            ErrorCode::Negotiation => "NEGOTIATION",
            ErrorCode::KeyGen => "KEY_GEN",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::HandshakeAuthFailed => "HANDSHAKE_AUTH_FAILED",
            ErrorCode::NonceMismatch => "NONCE_MISMATCH",
            ErrorCode::DigestMismatch => "DIGEST_MISMATCH",
            ErrorCode::Truncated => "TRUNCATED",
            ErrorCode::BadPassword => "BAD_PASSWORD",
            ErrorCode::StoreCorrupt => "STORE_CORRUPT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::TransportClosed => "TRANSPORT_CLOSED",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Whether this kind is fatal to the session (tiers 2 and 3).
    pub fn is_session_fatal(&self) -> bool {
        !matches!(
            self,
            ErrorCode::BadInput | ErrorCode::AlgMismatch | ErrorCode::Negotiation
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display() {
        assert_eq!(ErrorCode::AuthFailed.to_string(), "AUTH_FAILED");
        assert_eq!(
            ErrorCode::HandshakeAuthFailed.to_string(),
            "HANDSHAKE_AUTH_FAILED"
        );
    }

    #[test]
    fn tier_classification() {
        assert!(!ErrorCode::BadInput.is_session_fatal());
        assert!(!ErrorCode::AlgMismatch.is_session_fatal());
        assert!(ErrorCode::AuthFailed.is_session_fatal());
        assert!(ErrorCode::Timeout.is_session_fatal());
    }
}
