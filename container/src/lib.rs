//! Chunked AEAD streaming container.
//!
//! Frames an arbitrarily large plaintext as a fixed header followed by a
//! sequence of independently-authenticated AES-256-GCM chunks and a terminal
//! trailer chunk carrying a digest over everything that came before it. A
//! [`decode::StreamDecoder`] never hands back plaintext for a chunk that has
//! not authenticated, and only considers the stream complete once the
//! trailer's digest has been checked -- so truncating, reordering, or
//! tampering with the stream is caught even though each chunk is sealed
//! under its own nonce and tag.

pub mod chunk;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;

pub use decode::{decode_stream, StreamDecoder};
pub use encode::{encode_stream, StreamEncoder, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use error::{CodecError, CodecResult};
pub use header::ContainerHeader;
