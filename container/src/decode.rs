//! Streaming decoder: authenticates and unframes a sealed chunked container.
//!
//! Mirrors [`crate::encode::StreamEncoder`]'s state machine. No plaintext is
//! ever handed back to the caller before its chunk authenticates, and the
//! terminal trailer's digest must match every data chunk actually delivered
//! before the stream is considered complete -- this is what catches
//! truncation and chunk reordering that per-chunk AEAD alone would miss.

use crate::chunk::{self, open_chunk};
use crate::error::{CodecError, CodecResult};
use crate::header::ContainerHeader;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Streaming,
    Done,
}

pub struct StreamDecoder {
    key: [u8; 32],
    master_nonce_prefix: [u8; 8],
    chunk_size: u32,
    next_index: u32,
    digest: Sha256,
    state: DecoderState,
}

impl StreamDecoder {
    /// Parse the fixed-size header and start a decoder for the stream it describes.
    pub fn new(key: [u8; 32], header_bytes: &[u8]) -> CodecResult<Self> {
        let header = ContainerHeader::from_bytes(header_bytes)?;
        Ok(Self {
            key,
            master_nonce_prefix: header.master_nonce_prefix,
            chunk_size: header.chunk_size,
            next_index: 0,
            digest: Sha256::new(),
            state: DecoderState::Streaming,
        })
    }

    /// Open one chunk frame. The caller does not know up front whether it
    /// is a data chunk or the trailer; both are tried against the next
    /// expected index and discriminated by which one authenticates.
    ///
    /// Returns `Some(plaintext)` for a data chunk, `None` once the trailer
    /// has been verified (after which the decoder is [`Self::is_complete`]).
    pub fn decode_chunk(&mut self, frame: &[u8]) -> CodecResult<Option<Vec<u8>>> {
        if self.state != DecoderState::Streaming {
            return Err(CodecError::BadInput("decoder already finished".into()));
        }
        if frame.len() >= 4 {
            let ciphertext_length = u32::from_le_bytes(frame[0..4].try_into().unwrap());
            if ciphertext_length == 0 {
                return Err(CodecError::BadInput("data chunk ciphertext must be non-empty".into()));
            }
            if ciphertext_length as usize > self.chunk_size as usize {
                return Err(CodecError::BadInput(format!(
                    "chunk ciphertext of {ciphertext_length} bytes exceeds the configured chunk size of {}",
                    self.chunk_size
                )));
            }
        }

        if let Ok(plaintext) = open_chunk(&self.key, &self.master_nonce_prefix, self.next_index, false, frame) {
            self.digest.update(&plaintext);
            tracing::debug!(index = self.next_index, bytes = plaintext.len(), "chunk_opened");
            self.next_index = self
                .next_index
                .checked_add(1)
                .ok_or_else(|| CodecError::BadInput("chunk index overflowed u32".into()))?;
            return Ok(Some(plaintext));
        }

        let trailer = open_chunk(&self.key, &self.master_nonce_prefix, self.next_index, true, frame)?;
        if trailer.len() != 32 {
            return Err(CodecError::BadInput("trailer digest must be 32 bytes".into()));
        }
        let expected: [u8; 32] = self.digest.clone().finalize().into();
        if trailer.as_slice() != expected.as_slice() {
            return Err(CodecError::DigestMismatch);
        }
        self.state = DecoderState::Done;
        tracing::debug!("trailer_verified");
        Ok(None)
    }

    /// Whether the trailer has been seen and verified.
    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Done
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }
}

/// Decrypt a complete container from `reader` into `writer`, using bounded
/// `chunk_size`-sized buffers regardless of payload length.
///
/// Plaintext is written to `writer` only for chunks that have already
/// authenticated; the stream must end with a verified trailer or this
/// returns an error and nothing further should be trusted.
pub fn decode_stream<R: Read, W: Write>(mut reader: R, mut writer: W, key: [u8; 32]) -> CodecResult<()> {
    let mut header_buf = [0u8; crate::header::HEADER_LEN];
    read_exact_or_truncated(&mut reader, &mut header_buf, "container header")?;
    let mut decoder = StreamDecoder::new(key, &header_buf)?;

    let max_frame_len = chunk::frame_len(decoder.chunk_size() as usize).max(chunk::frame_len(32));

    loop {
        if decoder.is_complete() {
            break;
        }
        let mut len_buf = [0u8; 4];
        if !read_exact_or_eof(&mut reader, &mut len_buf)? {
            return Err(CodecError::Truncated("stream ended before trailer".into()));
        }
        let ciphertext_length = u32::from_le_bytes(len_buf) as usize;
        let frame_len = 4 + chunk::NONCE_SIZE + chunk::TAG_SIZE + ciphertext_length;
        if frame_len > max_frame_len {
            return Err(CodecError::BadInput(format!(
                "chunk frame of {frame_len} bytes exceeds the configured chunk size"
            )));
        }
        let mut rest = vec![0u8; frame_len - 4];
        read_exact_or_truncated(&mut reader, &mut rest, "chunk frame")?;

        let mut frame = Vec::with_capacity(frame_len);
        frame.extend_from_slice(&len_buf);
        frame.extend_from_slice(&rest);
        rest.clear();

        if let Some(plaintext) = decoder.decode_chunk(&frame)? {
            writer.write_all(&plaintext)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> CodecResult<()> {
    match read_exact_or_eof(reader, buf)? {
        true => Ok(()),
        false => Err(CodecError::Truncated(format!("stream ended while reading {what}"))),
    }
}

/// Like `Read::read_exact`, but returns `Ok(false)` on a clean EOF with zero
/// bytes read instead of erroring, so callers can distinguish "no more
/// chunks" from "truncated mid-chunk".
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> CodecResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CodecError::Io(e)),
        }
    }
    if filled == 0 {
        Ok(false)
    } else if filled == buf.len() {
        Ok(true)
    } else {
        Err(CodecError::Truncated("stream ended mid-chunk".into()))
    }
}
