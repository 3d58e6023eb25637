//! Session key derivation.
//!
//! Combines the hybrid KEM's 64-byte `classical_ss || pqc_ss` secret into a
//! single 32-byte AEAD key via HKDF-SHA256, with a fixed empty salt and a
//! fixed info string so both peers derive bit-identical keys without
//! exchanging any peer-specific derivation context.

use crate::error::{CryptoError, CryptoResult};
use crate::hybrid::SharedSecret;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

/// The fixed HKDF info string for session key derivation.
pub const SESSION_INFO: &[u8] = b"hybrid-pqc-session/v1";

/// A derived 32-byte AEAD session key. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct SessionKey(pub [u8; 32]);

impl SessionKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Derive the session key from a hybrid shared secret.
///
/// `HKDF-SHA256(salt = empty, ikm = classical_ss || pqc_ss, info =
/// "hybrid-pqc-session/v1")`, truncated to 32 bytes.
pub fn derive_session_key(shared: &SharedSecret) -> CryptoResult<SessionKey> {
    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(SESSION_INFO, &mut okm)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    Ok(SessionKey(okm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::{decapsulate, encapsulate, generate_keypair};
    use pqc_types::PqcAlg;

    #[test]
    fn derivation_is_deterministic() {
        let shared = SharedSecret([0x42; 64]);
        let key1 = derive_session_key(&shared).unwrap();
        let shared2 = SharedSecret([0x42; 64]);
        let key2 = derive_session_key(&shared2).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn different_secrets_derive_different_keys() {
        let key1 = derive_session_key(&SharedSecret([0x01; 64])).unwrap();
        let key2 = derive_session_key(&SharedSecret([0x02; 64])).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn both_peers_derive_the_same_session_key() {
        let (pk_b, sk_b) = generate_keypair(PqcAlg::MlKem768).unwrap();
        let (encap, secret_a) = encapsulate(&pk_b).unwrap();
        let secret_b = decapsulate(&sk_b, &encap).unwrap();

        let key_a = derive_session_key(&secret_a).unwrap();
        let key_b = derive_session_key(&secret_b).unwrap();
        assert_eq!(key_a.as_bytes(), key_b.as_bytes());
    }
}
