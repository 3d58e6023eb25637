//! Per-chunk AEAD framing.
//!
//! Each chunk (data or trailer) is sealed with AES-256-GCM under a nonce
//! derived from the stream's `master_nonce_prefix` and the chunk's index,
//! and authenticates a small off-wire associated-data header so a chunk
//! cannot be replayed at a different index or relabeled as the wrong kind.
//!
//! Wire layout of one chunk frame (bit-exact, little-endian):
//!
//! | field             | size |
//! |-------------------|-----:|
//! | ciphertext_length |    4 |
//! | nonce             |   12 |
//! | tag               |   16 |
//! | ciphertext        |  var |
//!
//! The nonce is redundant with `master_nonce_prefix` + the chunk's position
//! in the stream, but carrying it explicitly lets the decoder catch a
//! reordered or substituted chunk ([`CodecError::NonceMismatch`]) before it
//! even reaches AEAD verification.

use crate::error::{CodecError, CodecResult};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};

pub const TAG_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const AAD_SIZE: usize = 5;
/// Fixed overhead of a chunk frame besides its ciphertext.
pub const FRAME_OVERHEAD: usize = 4 + NONCE_SIZE + TAG_SIZE;

/// Build the 12-byte nonce for a chunk: `master_nonce_prefix(8) || index(4 LE)`.
pub fn chunk_nonce(master_nonce_prefix: &[u8; 8], index: u32) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..8].copy_from_slice(master_nonce_prefix);
    nonce[8..].copy_from_slice(&index.to_le_bytes());
    nonce
}

/// Build the off-wire associated data for a chunk: `index(4 LE) || is_trailer(1)`.
fn chunk_aad(index: u32, is_trailer: bool) -> [u8; AAD_SIZE] {
    let mut aad = [0u8; AAD_SIZE];
    aad[..4].copy_from_slice(&index.to_le_bytes());
    aad[4] = is_trailer as u8;
    aad
}

/// Seal one chunk and return its complete wire frame (length-prefixed
/// nonce + tag + ciphertext).
pub fn seal_chunk(
    key: &[u8; 32],
    master_nonce_prefix: &[u8; 8],
    index: u32,
    is_trailer: bool,
    plaintext: &[u8],
) -> CodecResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce_bytes = chunk_nonce(master_nonce_prefix, index);
    let aad = chunk_aad(index, is_trailer);
    let combined = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: plaintext, aad: &aad })
        .map_err(|_| CodecError::BadInput("chunk encryption failed".into()))?;
    let split = combined.len() - TAG_SIZE;
    let (ciphertext, tag) = combined.split_at(split);

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + ciphertext.len());
    frame.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    frame.extend_from_slice(&nonce_bytes);
    frame.extend_from_slice(tag);
    frame.extend_from_slice(ciphertext);
    Ok(frame)
}

/// Parse and authenticate one chunk frame.
///
/// `expected_index` is the position this chunk must occupy in the stream;
/// a frame whose embedded nonce encodes a different index is rejected with
/// [`CodecError::NonceMismatch`] without attempting decryption.
pub fn open_chunk(
    key: &[u8; 32],
    master_nonce_prefix: &[u8; 8],
    expected_index: u32,
    is_trailer: bool,
    frame: &[u8],
) -> CodecResult<Vec<u8>> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(CodecError::Truncated(format!(
            "chunk frame requires at least {FRAME_OVERHEAD} bytes, got {}",
            frame.len()
        )));
    }
    let ciphertext_length = u32::from_le_bytes(frame[0..4].try_into().unwrap()) as usize;
    let nonce_bytes: [u8; NONCE_SIZE] = frame[4..4 + NONCE_SIZE].try_into().unwrap();
    let tag = &frame[4 + NONCE_SIZE..4 + NONCE_SIZE + TAG_SIZE];
    let ciphertext = frame
        .get(FRAME_OVERHEAD..FRAME_OVERHEAD + ciphertext_length)
        .ok_or_else(|| CodecError::Truncated("chunk frame shorter than its declared length".into()))?;

    let expected_nonce = chunk_nonce(master_nonce_prefix, expected_index);
    if nonce_bytes != expected_nonce {
        let got = u32::from_le_bytes(nonce_bytes[8..12].try_into().unwrap());
        return Err(CodecError::NonceMismatch { index: expected_index, expected: expected_index, got });
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let aad = chunk_aad(expected_index, is_trailer);
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: &combined, aad: &aad })
        .map_err(|_| CodecError::AuthFailed { index: expected_index })
}

/// Total on-wire size of a frame holding `plaintext_len` bytes of plaintext.
pub fn frame_len(plaintext_len: usize) -> usize {
    FRAME_OVERHEAD + plaintext_len
}
