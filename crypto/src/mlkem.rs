use crate::error::{CryptoError, CryptoResult};
use ml_kem::{Decapsulate, Encapsulate, Kem, KeyExport, KeyInit, TryKeyInit};
use pqc_types::PqcAlg;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// ML-KEM key pair (FIPS 203).
///
/// Uses the `ml-kem` crate (RustCrypto) for a standards-compliant
/// implementation of the Module-Lattice-Based Key-Encapsulation Mechanism.
///
/// The secret key is automatically zeroized when dropped to prevent key
/// material from lingering in memory. The secret key is excluded from
/// serialization to prevent accidental leakage via JSON/logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlKemKeyPair {
    pub alg: PqcAlg,
    /// Serialized encapsulation (public) key bytes.
    pub public_key: Vec<u8>,
    /// Serialized decapsulation (secret) key bytes.
    #[serde(skip)]
    pub secret_key: Vec<u8>,
}

impl Drop for MlKemKeyPair {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

/// Result of an ML-KEM encapsulation operation against a peer's public key.
///
/// The shared secret is zeroized on drop.
#[derive(Debug, Clone)]
pub struct MlKemEncapsulated {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Vec<u8>,
}

impl Drop for MlKemEncapsulated {
    fn drop(&mut self) {
        self.shared_secret.zeroize();
    }
}

impl MlKemKeyPair {
    /// Generate a new ML-KEM key pair for the given parameter set using the OS RNG.
    pub fn generate(alg: PqcAlg) -> CryptoResult<Self> {
        match alg {
            PqcAlg::MlKem512 => {
                let (dk, ek) = ml_kem::MlKem512::generate_keypair_from_rng(&mut crate::rng::PqcRng);
                Ok(make_keypair(alg, ek.to_bytes().to_vec(), dk.to_bytes().to_vec()))
            }
            PqcAlg::MlKem768 => {
                let (dk, ek) = ml_kem::MlKem768::generate_keypair_from_rng(&mut crate::rng::PqcRng);
                Ok(make_keypair(alg, ek.to_bytes().to_vec(), dk.to_bytes().to_vec()))
            }
            PqcAlg::MlKem1024 => {
                let (dk, ek) = ml_kem::MlKem1024::generate_keypair_from_rng(&mut crate::rng::PqcRng);
                Ok(make_keypair(alg, ek.to_bytes().to_vec(), dk.to_bytes().to_vec()))
            }
        }
    }
}

/// Encapsulate against a peer's ML-KEM public key.
///
/// This is a pure function of `(alg, peer_public_key)` -- it never reads
/// ambient state from a caller's own key pair, so the same call works
/// identically whether invoked by an initiator or a responder.
pub fn encapsulate(alg: PqcAlg, peer_public_key: &[u8]) -> CryptoResult<MlKemEncapsulated> {
    match alg {
        PqcAlg::MlKem512 => {
            let ek = ml_kem::EncapsulationKey::<ml_kem::MlKem512>::new_from_slice(peer_public_key)
                .map_err(|_| invalid_pk(alg, peer_public_key.len()))?;
            let (ct, ss) = ek.encapsulate_with_rng(&mut crate::rng::PqcRng);
            Ok(MlKemEncapsulated { ciphertext: ct.to_vec(), shared_secret: ss.to_vec() })
        }
        PqcAlg::MlKem768 => {
            let ek = ml_kem::EncapsulationKey::<ml_kem::MlKem768>::new_from_slice(peer_public_key)
                .map_err(|_| invalid_pk(alg, peer_public_key.len()))?;
            let (ct, ss) = ek.encapsulate_with_rng(&mut crate::rng::PqcRng);
            Ok(MlKemEncapsulated { ciphertext: ct.to_vec(), shared_secret: ss.to_vec() })
        }
        PqcAlg::MlKem1024 => {
            let ek = ml_kem::EncapsulationKey::<ml_kem::MlKem1024>::new_from_slice(peer_public_key)
                .map_err(|_| invalid_pk(alg, peer_public_key.len()))?;
            let (ct, ss) = ek.encapsulate_with_rng(&mut crate::rng::PqcRng);
            Ok(MlKemEncapsulated { ciphertext: ct.to_vec(), shared_secret: ss.to_vec() })
        }
    }
}

/// Decapsulate a ciphertext against our own secret key.
///
/// Per FIPS 203, a ciphertext that does not correspond to the given secret
/// key does not cause an error: the decapsulation mechanism performs
/// implicit rejection and returns a deterministic, indistinguishable-from-
/// random secret instead. Only malformed (wrong-length) inputs are rejected
/// here before reaching the primitive.
pub fn decapsulate(alg: PqcAlg, secret_key: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    match alg {
        PqcAlg::MlKem512 => {
            let dk = ml_kem::DecapsulationKey::<ml_kem::MlKem512>::new_from_slice(secret_key)
                .map_err(|_| invalid_sk(alg, secret_key.len()))?;
            let ss = dk
                .decapsulate_slice(ciphertext)
                .map_err(|_| malformed_ct(alg, ciphertext.len()))?;
            Ok(ss.to_vec())
        }
        PqcAlg::MlKem768 => {
            let dk = ml_kem::DecapsulationKey::<ml_kem::MlKem768>::new_from_slice(secret_key)
                .map_err(|_| invalid_sk(alg, secret_key.len()))?;
            let ss = dk
                .decapsulate_slice(ciphertext)
                .map_err(|_| malformed_ct(alg, ciphertext.len()))?;
            Ok(ss.to_vec())
        }
        PqcAlg::MlKem1024 => {
            let dk = ml_kem::DecapsulationKey::<ml_kem::MlKem1024>::new_from_slice(secret_key)
                .map_err(|_| invalid_sk(alg, secret_key.len()))?;
            let ss = dk
                .decapsulate_slice(ciphertext)
                .map_err(|_| malformed_ct(alg, ciphertext.len()))?;
            Ok(ss.to_vec())
        }
    }
}

fn invalid_pk(alg: PqcAlg, len: usize) -> CryptoError {
    CryptoError::Encapsulation(format!("invalid {alg} encapsulation key ({len} bytes)"))
}

fn invalid_sk(alg: PqcAlg, len: usize) -> CryptoError {
    CryptoError::Decapsulation(format!("invalid {alg} decapsulation key ({len} bytes)"))
}

fn malformed_ct(alg: PqcAlg, len: usize) -> CryptoError {
    CryptoError::Decapsulation(format!("malformed {alg} ciphertext ({len} bytes)"))
}

fn make_keypair(alg: PqcAlg, public_key: Vec<u8>, secret_key: Vec<u8>) -> MlKemKeyPair {
    tracing::debug!(
        algorithm = %alg,
        pk_bytes = public_key.len(),
        sk_bytes = secret_key.len(),
        "generated ML-KEM key pair (FIPS 203)"
    );
    MlKemKeyPair { alg, public_key, secret_key }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_produces_keys() {
        for alg in [PqcAlg::MlKem512, PqcAlg::MlKem768, PqcAlg::MlKem1024] {
            let kp = MlKemKeyPair::generate(alg).unwrap();
            assert_eq!(kp.public_key.len(), alg.public_key_size());
            assert_eq!(kp.secret_key.len(), alg.secret_key_size());
        }
    }

    #[test]
    fn encapsulate_decapsulate_round_trip() {
        for alg in [PqcAlg::MlKem512, PqcAlg::MlKem768, PqcAlg::MlKem1024] {
            let kp = MlKemKeyPair::generate(alg).unwrap();
            let enc = encapsulate(alg, &kp.public_key).unwrap();
            let shared = decapsulate(alg, &kp.secret_key, &enc.ciphertext).unwrap();
            assert_eq!(enc.shared_secret, shared);
            assert_eq!(shared.len(), 32);
        }
    }

    #[test]
    fn each_encapsulation_is_fresh() {
        let kp = MlKemKeyPair::generate(PqcAlg::MlKem768).unwrap();
        let enc1 = encapsulate(PqcAlg::MlKem768, &kp.public_key).unwrap();
        let enc2 = encapsulate(PqcAlg::MlKem768, &kp.public_key).unwrap();
        assert_ne!(enc1.ciphertext, enc2.ciphertext);
        assert_ne!(enc1.shared_secret, enc2.shared_secret);
    }

    #[test]
    fn malformed_ciphertext_length_is_rejected() {
        let kp = MlKemKeyPair::generate(PqcAlg::MlKem512).unwrap();
        let result = decapsulate(PqcAlg::MlKem512, &kp.secret_key, &[0u8; 10]);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_secret_key_triggers_implicit_rejection_not_error() {
        // A syntactically valid but foreign secret key must still produce a
        // (wrong) shared secret rather than an error -- FIPS 203 implicit
        // rejection, not an exception.
        let kp_a = MlKemKeyPair::generate(PqcAlg::MlKem768).unwrap();
        let kp_b = MlKemKeyPair::generate(PqcAlg::MlKem768).unwrap();
        let enc = encapsulate(PqcAlg::MlKem768, &kp_a.public_key).unwrap();
        let wrong = decapsulate(PqcAlg::MlKem768, &kp_b.secret_key, &enc.ciphertext).unwrap();
        assert_ne!(wrong, enc.shared_secret);
    }
}
