//! Fixed-size container header.
//!
//! Layout (25 bytes, all integers little-endian):
//!
//! | offset | size | field                |
//! |-------:|-----:|----------------------|
//! |      0 |    4 | magic `b"PQCS"`      |
//! |      4 |    1 | version              |
//! |      5 |    4 | chunk_size           |
//! |      9 |    8 | plaintext_length     |
//! |     17 |    8 | master_nonce_prefix  |

use crate::error::{CodecError, CodecResult};

pub const MAGIC: &[u8; 4] = b"PQCS";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 25;

/// Sentinel written to `plaintext_length` when the total size is not known
/// up front (e.g. streaming from a pipe).
pub const UNKNOWN_LENGTH: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub chunk_size: u32,
    pub plaintext_length: u64,
    pub master_nonce_prefix: [u8; 8],
}

impl ContainerHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(MAGIC);
        out[4] = VERSION;
        out[5..9].copy_from_slice(&self.chunk_size.to_le_bytes());
        out[9..17].copy_from_slice(&self.plaintext_length.to_le_bytes());
        out[17..25].copy_from_slice(&self.master_nonce_prefix);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::Truncated(format!(
                "header requires {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(CodecError::BadInput("bad container magic".into()));
        }
        let version = bytes[4];
        if version != VERSION {
            return Err(CodecError::BadInput(format!(
                "unsupported container version {version}"
            )));
        }
        let chunk_size = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
        let plaintext_length = u64::from_le_bytes(bytes[9..17].try_into().unwrap());
        let mut master_nonce_prefix = [0u8; 8];
        master_nonce_prefix.copy_from_slice(&bytes[17..25]);
        Ok(Self { chunk_size, plaintext_length, master_nonce_prefix })
    }
}
