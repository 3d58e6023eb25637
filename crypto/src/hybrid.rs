//! Hybrid X25519 + ML-KEM key establishment.
//!
//! Combines a classical Diffie-Hellman exchange with a post-quantum KEM so
//! that breaking either primitive alone does not compromise the session.
//!
//! The encapsulator's ephemeral X25519 public key travels inside
//! [`EncapsulatedKey`] itself, so [`decapsulate`] is a pure function of
//! `(own_sk, encap)` -- it never reaches into ambient state held by a key
//! pair object. An earlier shape of this code stored the encapsulator's
//! ephemeral classical secret on the key pair and had the decapsulator
//! substitute a placeholder when it wasn't there; carrying the public half
//! explicitly removes the need for that placeholder entirely.

use crate::error::{CryptoError, CryptoResult};
use crate::mlkem::{self, MlKemKeyPair};
use pqc_types::PqcAlg;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A hybrid public key bundle: classical X25519 point plus ML-KEM encapsulation key.
///
/// Immutable once produced. [`HybridPublicKey::to_bytes`]/[`HybridPublicKey::from_bytes`]
/// give the self-describing, length-prefixed wire form exchanged in the
/// handshake's `HELLO`/`HELLO_ACK` messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridPublicKey {
    pub classical_pk: [u8; 32],
    pub pqc_pk: Vec<u8>,
    pub pqc_alg: PqcAlg,
}

impl HybridPublicKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 32 + 4 + self.pqc_pk.len());
        out.push(self.pqc_alg.wire_tag());
        out.extend_from_slice(&self.classical_pk);
        out.extend_from_slice(&(self.pqc_pk.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.pqc_pk);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < 1 + 32 + 4 {
            return Err(CryptoError::InvalidKeyMaterial(
                "hybrid public key bundle too short".into(),
            ));
        }
        let pqc_alg = PqcAlg::from_wire_tag(bytes[0])
            .ok_or_else(|| CryptoError::InvalidKeyMaterial(format!("unknown PQC tag {}", bytes[0])))?;
        let mut classical_pk = [0u8; 32];
        classical_pk.copy_from_slice(&bytes[1..33]);
        let pqc_len = u32::from_le_bytes(bytes[33..37].try_into().unwrap()) as usize;
        let pqc_pk = bytes
            .get(37..37 + pqc_len)
            .ok_or_else(|| CryptoError::InvalidKeyMaterial("truncated PQC public key".into()))?
            .to_vec();
        if pqc_pk.len() != pqc_alg.public_key_size() {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "{pqc_alg} public key must be {} bytes, got {}",
                pqc_alg.public_key_size(),
                pqc_pk.len()
            )));
        }
        Ok(Self { classical_pk, pqc_pk, pqc_alg })
    }
}

/// A hybrid secret key bundle. Never transmitted; zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct HybridSecretKey {
    classical_sk: [u8; 32],
    pqc_sk: Vec<u8>,
    #[zeroize(skip)]
    pub pqc_alg: PqcAlg,
}

/// Output of [`encapsulate`]: carries everything the decapsulator needs,
/// including the encapsulator's ephemeral classical public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedKey {
    pub pqc_ct: Vec<u8>,
    pub classical_pk_of_sender: [u8; 32],
    pub pqc_alg: PqcAlg,
}

impl EncapsulatedKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 32 + 4 + self.pqc_ct.len());
        out.push(self.pqc_alg.wire_tag());
        out.extend_from_slice(&self.classical_pk_of_sender);
        out.extend_from_slice(&(self.pqc_ct.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.pqc_ct);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < 1 + 32 + 4 {
            return Err(CryptoError::InvalidKeyMaterial(
                "encapsulated key bundle too short".into(),
            ));
        }
        let pqc_alg = PqcAlg::from_wire_tag(bytes[0])
            .ok_or_else(|| CryptoError::InvalidKeyMaterial(format!("unknown PQC tag {}", bytes[0])))?;
        let mut classical_pk_of_sender = [0u8; 32];
        classical_pk_of_sender.copy_from_slice(&bytes[1..33]);
        let ct_len = u32::from_le_bytes(bytes[33..37].try_into().unwrap()) as usize;
        let pqc_ct = bytes
            .get(37..37 + ct_len)
            .ok_or_else(|| CryptoError::InvalidKeyMaterial("truncated PQC ciphertext".into()))?
            .to_vec();
        Ok(Self { pqc_ct, classical_pk_of_sender, pqc_alg })
    }
}

/// The 64-byte `classical_ss || pqc_ss` buffer handed to the session KDF.
/// Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret(pub [u8; 64]);

impl SharedSecret {
    fn new(classical_ss: &[u8; 32], pqc_ss: &[u8]) -> Self {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(classical_ss);
        buf[32..].copy_from_slice(pqc_ss);
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl HybridSecretKey {
    /// Expose the raw key halves for at-rest storage. Callers (e.g. a
    /// keystore) own sealing these bytes before writing them anywhere;
    /// this accessor only exists so the secret key itself doesn't need a
    /// wire format of its own.
    pub fn classical_sk_for_storage(&self) -> [u8; 32] {
        self.classical_sk
    }

    pub fn pqc_sk_for_storage(&self) -> &[u8] {
        &self.pqc_sk
    }
}

/// Generate a fresh hybrid key pair: an X25519 pair plus an ML-KEM pair for `alg`.
pub fn generate_keypair(alg: PqcAlg) -> CryptoResult<(HybridPublicKey, HybridSecretKey)> {
    let mut classical_sk_bytes = [0u8; 32];
    getrandom::fill(&mut classical_sk_bytes)
        .map_err(|e| CryptoError::KeyGeneration { algorithm: "X25519".into(), reason: e.to_string() })?;
    let classical_secret = StaticSecret::from(classical_sk_bytes);
    let classical_public = PublicKey::from(&classical_secret);

    let pqc_kp = MlKemKeyPair::generate(alg)?;

    let public = HybridPublicKey {
        classical_pk: *classical_public.as_bytes(),
        pqc_pk: pqc_kp.public_key.clone(),
        pqc_alg: alg,
    };
    let secret = HybridSecretKey {
        classical_sk: classical_sk_bytes,
        pqc_sk: pqc_kp.secret_key.clone(),
        pqc_alg: alg,
    };

    classical_sk_bytes.zeroize();
    tracing::debug!(algorithm = %alg, "generated hybrid X25519+ML-KEM key pair");
    Ok((public, secret))
}

/// Encapsulate against a peer's hybrid public key.
///
/// Generates a fresh X25519 ephemeral pair, runs the classical DH against
/// `peer_pk.classical_pk`, runs ML-KEM encapsulation against
/// `peer_pk.pqc_pk`, and returns both the wire-ready [`EncapsulatedKey`] and
/// the 64-byte shared secret.
pub fn encapsulate(peer_pk: &HybridPublicKey) -> CryptoResult<(EncapsulatedKey, SharedSecret)> {
    let mut ephemeral_bytes = [0u8; 32];
    getrandom::fill(&mut ephemeral_bytes)
        .map_err(|e| CryptoError::KeyGeneration { algorithm: "X25519".into(), reason: e.to_string() })?;
    let ephemeral_secret = StaticSecret::from(ephemeral_bytes);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    ephemeral_bytes.zeroize();

    let peer_classical_public = PublicKey::from(peer_pk.classical_pk);
    let classical_ss = ephemeral_secret.diffie_hellman(&peer_classical_public);

    let pqc_enc = mlkem::encapsulate(peer_pk.pqc_alg, &peer_pk.pqc_pk)?;

    let shared = SharedSecret::new(classical_ss.as_bytes(), &pqc_enc.shared_secret);
    let encap = EncapsulatedKey {
        pqc_ct: pqc_enc.ciphertext.clone(),
        classical_pk_of_sender: *ephemeral_public.as_bytes(),
        pqc_alg: peer_pk.pqc_alg,
    };

    tracing::debug!(algorithm = %peer_pk.pqc_alg, "encapsulated hybrid shared secret");
    Ok((encap, shared))
}

/// Decapsulate an [`EncapsulatedKey`] using our own secret key.
///
/// A pure function of its two arguments: no state from a prior
/// `encapsulate` call is required or consulted.
pub fn decapsulate(own_sk: &HybridSecretKey, encap: &EncapsulatedKey) -> CryptoResult<SharedSecret> {
    if encap.pqc_alg != own_sk.pqc_alg {
        return Err(CryptoError::AlgMismatch {
            encap: encap.pqc_alg.to_string(),
            own: own_sk.pqc_alg.to_string(),
        });
    }

    let classical_secret = StaticSecret::from(own_sk.classical_sk);
    let sender_classical_public = PublicKey::from(encap.classical_pk_of_sender);
    let classical_ss = classical_secret.diffie_hellman(&sender_classical_public);

    let pqc_ss = mlkem::decapsulate(own_sk.pqc_alg, &own_sk.pqc_sk, &encap.pqc_ct)?;

    tracing::debug!(algorithm = %own_sk.pqc_alg, "decapsulated hybrid shared secret");
    Ok(SharedSecret::new(classical_ss.as_bytes(), &pqc_ss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_produces_expected_sizes() {
        let (pk, _sk) = generate_keypair(PqcAlg::MlKem768).unwrap();
        assert_eq!(pk.classical_pk.len(), 32);
        assert_eq!(pk.pqc_pk.len(), PqcAlg::MlKem768.public_key_size());
    }

    #[test]
    fn encapsulate_decapsulate_agree() {
        let (pk_b, sk_b) = generate_keypair(PqcAlg::MlKem768).unwrap();
        let (encap, shared_a) = encapsulate(&pk_b).unwrap();
        let shared_b = decapsulate(&sk_b, &encap).unwrap();
        assert_eq!(shared_a.as_bytes(), shared_b.as_bytes());
    }

    #[test]
    fn both_peers_can_encapsulate_against_each_other() {
        // The fixed bug: each side encapsulates against the *other's*
        // public key, never its own.
        let (pk_a, sk_a) = generate_keypair(PqcAlg::MlKem512).unwrap();
        let (pk_b, sk_b) = generate_keypair(PqcAlg::MlKem512).unwrap();

        let (encap_a_to_b, secret_a) = encapsulate(&pk_b).unwrap();
        let (encap_b_to_a, secret_b) = encapsulate(&pk_a).unwrap();

        let recovered_by_b = decapsulate(&sk_b, &encap_a_to_b).unwrap();
        let recovered_by_a = decapsulate(&sk_a, &encap_b_to_a).unwrap();

        assert_eq!(secret_a.as_bytes(), recovered_by_b.as_bytes());
        assert_eq!(secret_b.as_bytes(), recovered_by_a.as_bytes());
    }

    #[test]
    fn alg_mismatch_is_rejected() {
        let (pk_b, _) = generate_keypair(PqcAlg::MlKem768).unwrap();
        let (_, sk_a) = generate_keypair(PqcAlg::MlKem1024).unwrap();
        let (encap, _) = encapsulate(&pk_b).unwrap();
        let result = decapsulate(&sk_a, &encap);
        assert!(matches!(result, Err(CryptoError::AlgMismatch { .. })));
    }

    #[test]
    fn public_key_wire_round_trip() {
        let (pk, _sk) = generate_keypair(PqcAlg::MlKem1024).unwrap();
        let bytes = pk.to_bytes();
        let parsed = HybridPublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(pk, parsed);
    }

    #[test]
    fn encapsulated_key_wire_round_trip() {
        let (pk_b, _sk_b) = generate_keypair(PqcAlg::MlKem512).unwrap();
        let (encap, _) = encapsulate(&pk_b).unwrap();
        let bytes = encap.to_bytes();
        let parsed = EncapsulatedKey::from_bytes(&bytes).unwrap();
        assert_eq!(encap, parsed);
    }

    #[test]
    fn different_sessions_produce_different_secrets() {
        let (pk_b, _sk_b) = generate_keypair(PqcAlg::MlKem768).unwrap();
        let (_, secret1) = encapsulate(&pk_b).unwrap();
        let (_, secret2) = encapsulate(&pk_b).unwrap();
        assert_ne!(secret1.as_bytes(), secret2.as_bytes());
    }
}
