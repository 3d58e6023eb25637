//! Password-derived wrapping key and AES-256-GCM sealing for at-rest blobs.
//!
//! Both the master-key blob and each individual `<key_id>.key` blob use the
//! same sealed-envelope shape: a random nonce followed by an AEAD
//! ciphertext. The master blob additionally prefixes the PBKDF2 salt, per
//! spec.md section 6 (`salt(16) || aead_sealed(master_key_32)`).

use crate::error::{KeystoreError, KeystoreResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// The 32-byte key that wraps every blob in a keystore directory, held only
/// for the lifetime of an open [`crate::store::KeyStore`].
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey(pub [u8; 32]);

/// Derive the password-wrapping key used to seal the master key.
///
/// Mirrors `key_manager.py`'s PBKDF2-HMAC-SHA256 derivation: 100,000
/// iterations over the UTF-8 password bytes and a random per-store salt.
pub fn derive_wrap_key(password: &[u8], salt: &[u8; SALT_LEN]) -> MasterKey {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut out);
    MasterKey(out)
}

/// Seal `plaintext` under `key`, returning `nonce(12) || ciphertext+tag`.
pub fn seal(key: &MasterKey, plaintext: &[u8]) -> KeystoreResult<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    getrandom::fill(&mut nonce_bytes)
        .map_err(|e| KeystoreError::BadInput(format!("rng failure: {e}")))?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| KeystoreError::BadInput("seal failure".into()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.append(&mut ciphertext);
    nonce_bytes.zeroize();
    Ok(out)
}

/// Open a blob produced by [`seal`]. AEAD failure surfaces as
/// [`KeystoreError::BadPassword`] at the master-blob layer and as
/// [`KeystoreError::Corrupt`] at the per-key layer; callers pick the
/// mapping since the same primitive backs both.
pub fn open(key: &MasterKey, sealed: &[u8]) -> Option<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return None;
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).ok()
}

/// A fresh random salt for a new keystore directory.
pub fn generate_salt() -> KeystoreResult<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::fill(&mut salt)
        .map_err(|e| KeystoreError::BadInput(format!("rng failure: {e}")))?;
    Ok(salt)
}

/// A fresh random 32-byte master key for a new keystore directory.
pub fn generate_master_key() -> KeystoreResult<[u8; 32]> {
    let mut key = [0u8; 32];
    getrandom::fill(&mut key)
        .map_err(|e| KeystoreError::BadInput(format!("rng failure: {e}")))?;
    Ok(key)
}
