//! Streaming encoder: frames plaintext into a sealed chunked container.
//!
//! [`StreamEncoder`] buffers at most one plaintext chunk (`chunk_size` bytes)
//! at a time, so memory use stays bounded regardless of payload size. The
//! terminal call to [`StreamEncoder::finish`] emits a trailer chunk carrying
//! the SHA-256 digest of every data chunk's plaintext, giving the decoder a
//! way to detect truncation or chunk reordering that per-chunk AEAD alone
//! cannot catch.

use crate::chunk::seal_chunk;
use crate::error::{CodecError, CodecResult};
use crate::header::{ContainerHeader, UNKNOWN_LENGTH};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

pub const MIN_CHUNK_SIZE: u32 = 64 * 1024;
pub const MAX_CHUNK_SIZE: u32 = 16 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: u32 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Streaming,
    Closed,
}

/// A chunk-at-a-time encoder over an explicit session key.
pub struct StreamEncoder {
    key: [u8; 32],
    chunk_size: u32,
    master_nonce_prefix: [u8; 8],
    next_index: u32,
    digest: Sha256,
    state: EncoderState,
}

impl StreamEncoder {
    /// Start a new container: returns the encoder plus the header bytes the
    /// caller must write before any chunk.
    pub fn new(
        key: [u8; 32],
        chunk_size: u32,
        plaintext_length: Option<u64>,
    ) -> CodecResult<(Self, Vec<u8>)> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(CodecError::BadInput(format!(
                "chunk_size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}, got {chunk_size}"
            )));
        }
        let mut master_nonce_prefix = [0u8; 8];
        getrandom::fill(&mut master_nonce_prefix)
            .map_err(|e| CodecError::BadInput(format!("failed to generate nonce prefix: {e}")))?;

        let header = ContainerHeader {
            chunk_size,
            plaintext_length: plaintext_length.unwrap_or(UNKNOWN_LENGTH),
            master_nonce_prefix,
        };

        Ok((
            Self {
                key,
                chunk_size,
                master_nonce_prefix,
                next_index: 0,
                digest: Sha256::new(),
                state: EncoderState::Streaming,
            },
            header.to_bytes().to_vec(),
        ))
    }

    /// Seal one data chunk into its complete wire frame. `plaintext` must be
    /// non-empty and at most `chunk_size` bytes; callers supply chunks in order.
    pub fn encode_chunk(&mut self, plaintext: &[u8]) -> CodecResult<Vec<u8>> {
        if self.state != EncoderState::Streaming {
            return Err(CodecError::BadInput("encoder already finished".into()));
        }
        if plaintext.is_empty() || plaintext.len() > self.chunk_size as usize {
            return Err(CodecError::BadInput(format!(
                "data chunk must be 1..={} bytes, got {}",
                self.chunk_size,
                plaintext.len()
            )));
        }
        self.digest.update(plaintext);
        let frame = seal_chunk(&self.key, &self.master_nonce_prefix, self.next_index, false, plaintext)?;
        self.next_index = self
            .next_index
            .checked_add(1)
            .ok_or_else(|| CodecError::BadInput("chunk index overflowed u32".into()))?;
        tracing::debug!(index = self.next_index - 1, bytes = plaintext.len(), "chunk_sealed");
        Ok(frame)
    }

    /// Seal the terminal trailer chunk carrying the running digest. Consumes
    /// the encoder; no further chunks may be produced afterwards.
    pub fn finish(mut self) -> CodecResult<Vec<u8>> {
        if self.state != EncoderState::Streaming {
            return Err(CodecError::BadInput("encoder already finished".into()));
        }
        let digest: [u8; 32] = self.digest.finalize_reset().into();
        let frame = seal_chunk(&self.key, &self.master_nonce_prefix, self.next_index, true, &digest)?;
        self.state = EncoderState::Closed;
        Ok(frame)
    }
}

/// Encrypt `reader` to `writer` as a complete container, using bounded
/// `chunk_size`-sized buffers regardless of input length.
pub fn encode_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    key: [u8; 32],
    chunk_size: u32,
    plaintext_length: Option<u64>,
) -> CodecResult<()> {
    let (mut encoder, header) = StreamEncoder::new(key, chunk_size, plaintext_length)?;
    writer.write_all(&header)?;

    let mut buf = vec![0u8; chunk_size as usize];
    loop {
        let n = fill_buf(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        let frame = encoder.encode_chunk(&buf[..n])?;
        writer.write_all(&frame)?;
        if n < buf.len() {
            break;
        }
    }

    let trailer = encoder.finish()?;
    writer.write_all(&trailer)?;
    writer.flush()?;
    Ok(())
}

/// Read up to `buf.len()` bytes, stopping early only at EOF (unlike a bare
/// `Read::read`, which may return fewer bytes than requested even mid-stream).
fn fill_buf<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
