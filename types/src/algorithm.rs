use serde::{Deserialize, Serialize};
use std::fmt;

/// Post-quantum KEM parameter set (FIPS 203 / ML-KEM family).
///
/// Wire tag per the handshake schema: `0x01` = `MlKem512`, `0x02` =
/// `MlKem768`, `0x03` = `MlKem1024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PqcAlg {
    MlKem512,
    MlKem768,
    MlKem1024,
}

/// AEAD identifier carried in the handshake suite negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeadAlg {
    Aes256Gcm,
}

impl PqcAlg {
    /// Decode the single-byte wire tag used in `HELLO`/`HELLO_ACK`.
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::MlKem512),
            0x02 => Some(Self::MlKem768),
            0x03 => Some(Self::MlKem1024),
            _ => None,
        }
    }

    /// Encode the single-byte wire tag.
    pub fn wire_tag(self) -> u8 {
        match self {
            Self::MlKem512 => 0x01,
            Self::MlKem768 => 0x02,
            Self::MlKem1024 => 0x03,
        }
    }

    /// Encapsulation (public) key size in bytes, per FIPS 203.
    pub fn public_key_size(self) -> usize {
        match self {
            Self::MlKem512 => 800,
            Self::MlKem768 => 1184,
            Self::MlKem1024 => 1568,
        }
    }

    /// Decapsulation (secret) key size in bytes, per FIPS 203.
    pub fn secret_key_size(self) -> usize {
        match self {
            Self::MlKem512 => 1632,
            Self::MlKem768 => 2400,
            Self::MlKem1024 => 3168,
        }
    }

    /// Ciphertext size in bytes, per FIPS 203.
    pub fn ciphertext_size(self) -> usize {
        match self {
            Self::MlKem512 => 768,
            Self::MlKem768 => 1088,
            Self::MlKem1024 => 1568,
        }
    }

    /// NIST security level (1, 3, or 5).
    pub fn security_level(self) -> u8 {
        match self {
            Self::MlKem512 => 1,
            Self::MlKem768 => 3,
            Self::MlKem1024 => 5,
        }
    }
}

impl AeadAlg {
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Aes256Gcm),
            _ => None,
        }
    }

    pub fn wire_tag(self) -> u8 {
        match self {
            Self::Aes256Gcm => 0x01,
        }
    }
}

impl fmt::Display for PqcAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MlKem512 => write!(f, "ML-KEM-512"),
            Self::MlKem768 => write!(f, "ML-KEM-768"),
            Self::MlKem1024 => write!(f, "ML-KEM-1024"),
        }
    }
}

impl fmt::Display for AeadAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes256Gcm => write!(f, "AES-256-GCM"),
        }
    }
}

/// A negotiated suite: one PQC parameter set plus one AEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub pqc_alg: PqcAlg,
    pub aead_alg: AeadAlg,
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+X25519/{}", self.pqc_alg, self.aead_alg)
    }
}
