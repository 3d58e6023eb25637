//! Password-encrypted at-rest storage for hybrid PQC key pairs.
//!
//! One directory, one master password: [`store::KeyStore::open`] derives a
//! wrapping key via PBKDF2-HMAC-SHA256 and uses it to seal a random master
//! key, which in turn seals every individual entry under AES-256-GCM. See
//! spec.md section 5 (C5) for the at-rest format and section 6 for the
//! wire/storage schema this crate implements.

pub mod error;
mod lock;
mod master;
pub mod store;
pub mod stored_key;

pub use error::{KeystoreError, KeystoreResult};
pub use store::KeyStore;
pub use stored_key::{validate_key_id, KeyMetadata, StoredKey, StoredPrivateKey, StoredPublicKey};
