//! The structured blob sealed inside each `<key_id>.key` file.

use pqc_types::PqcAlg;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A long-lived hybrid key pair plus its bookkeeping metadata, as kept at
/// rest in the keystore. Mirrors spec.md section 3's `StoredKey` entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKey {
    pub key_id: String,
    pub algorithm: PqcAlg,
    pub public_key: StoredPublicKey,
    /// Absent for public-only (imported) entries.
    pub private_key: Option<StoredPrivateKey>,
    pub created_at: u64,
    pub metadata: BTreeMap<String, String>,
}

/// Wire-ready hybrid public key halves, stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPublicKey {
    pub classical_pk: [u8; 32],
    pub pqc_pk: Vec<u8>,
}

/// Wire-ready hybrid secret key halves. Zeroized on drop since this is
/// the one place in the keystore private key material sits fully
/// reconstructed in memory outside its owning component.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredPrivateKey {
    pub classical_sk: [u8; 32],
    pub pqc_sk: Vec<u8>,
}

/// Metadata returned by [`crate::store::KeyStore::list`] without touching
/// any private key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub key_id: String,
    pub algorithm: PqcAlg,
    pub created_at: u64,
    pub metadata: BTreeMap<String, String>,
}

impl From<&StoredKey> for KeyMetadata {
    fn from(key: &StoredKey) -> Self {
        Self {
            key_id: key.key_id.clone(),
            algorithm: key.algorithm,
            created_at: key.created_at,
            metadata: key.metadata.clone(),
        }
    }
}

/// Validate a key id against spec.md section 6's charset
/// (`[A-Za-z0-9_-]`, length 1..=128).
pub fn validate_key_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
