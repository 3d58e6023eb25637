//! Wire framing for handshake and data-phase messages.
//!
//! Every message is a self-describing byte string: one tag byte followed by
//! a tag-specific payload. The transport is responsible for delivering each
//! encoded message as a single discrete unit (it never needs to look inside
//! one); `to_bytes`/`from_bytes` here are the only place that does.

use crate::error::{ChannelError, ChannelResult};
use pqc_crypto::hybrid::{EncapsulatedKey, HybridPublicKey};
use pqc_types::{AeadAlg, PqcAlg, Suite};

const TAG_HELLO: u8 = 0x01;
const TAG_HELLO_ACK: u8 = 0x02;
const TAG_SUITE_REJECTED: u8 = 0x03;
const TAG_ENCAP: u8 = 0x04;
const TAG_FINISH: u8 = 0x05;

const TAG_STREAM_HEADER: u8 = 0x10;
const TAG_CHUNK: u8 = 0x11;
const TAG_TRAILER: u8 = 0x12;
const TAG_CLOSE_STREAM: u8 = 0x13;

/// A handshake message per spec.md section 6: `HELLO`, `HELLO_ACK`,
/// `SUITE_REJECTED`, `ENCAP`, `FINISH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    Hello { suite: Suite, hybrid_pk: HybridPublicKey },
    HelloAck { suite: Suite, hybrid_pk: HybridPublicKey },
    SuiteRejected { reason: String },
    Encap { encap: EncapsulatedKey },
    Finish { mac: [u8; 32] },
}

impl HandshakeMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            HandshakeMessage::Hello { suite, hybrid_pk } => {
                encode_suite_and_key(TAG_HELLO, *suite, hybrid_pk)
            }
            HandshakeMessage::HelloAck { suite, hybrid_pk } => {
                encode_suite_and_key(TAG_HELLO_ACK, *suite, hybrid_pk)
            }
            HandshakeMessage::SuiteRejected { reason } => {
                let mut out = vec![TAG_SUITE_REJECTED];
                let reason_bytes = reason.as_bytes();
                out.extend_from_slice(&(reason_bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(reason_bytes);
                out
            }
            HandshakeMessage::Encap { encap } => {
                let mut out = vec![TAG_ENCAP];
                out.extend_from_slice(&encap.to_bytes());
                out
            }
            HandshakeMessage::Finish { mac } => {
                let mut out = vec![TAG_FINISH];
                out.extend_from_slice(mac);
                out
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> ChannelResult<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| ChannelError::BadInput("empty handshake message".into()))?;
        match tag {
            TAG_HELLO => {
                let (suite, hybrid_pk) = decode_suite_and_key(rest)?;
                Ok(HandshakeMessage::Hello { suite, hybrid_pk })
            }
            TAG_HELLO_ACK => {
                let (suite, hybrid_pk) = decode_suite_and_key(rest)?;
                Ok(HandshakeMessage::HelloAck { suite, hybrid_pk })
            }
            TAG_SUITE_REJECTED => {
                if rest.len() < 4 {
                    return Err(ChannelError::BadInput("truncated SUITE_REJECTED".into()));
                }
                let len = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
                let reason_bytes = rest
                    .get(4..4 + len)
                    .ok_or_else(|| ChannelError::BadInput("truncated SUITE_REJECTED reason".into()))?;
                let reason = String::from_utf8_lossy(reason_bytes).into_owned();
                Ok(HandshakeMessage::SuiteRejected { reason })
            }
            TAG_ENCAP => {
                let encap = EncapsulatedKey::from_bytes(rest)
                    .map_err(|e| ChannelError::BadInput(format!("bad ENCAP payload: {e}")))?;
                Ok(HandshakeMessage::Encap { encap })
            }
            TAG_FINISH => {
                if rest.len() != 32 {
                    return Err(ChannelError::BadInput("FINISH mac must be 32 bytes".into()));
                }
                let mut mac = [0u8; 32];
                mac.copy_from_slice(rest);
                Ok(HandshakeMessage::Finish { mac })
            }
            other => Err(ChannelError::Protocol(format!("unknown handshake message tag {other:#x}"))),
        }
    }
}

fn encode_suite_and_key(tag: u8, suite: Suite, hybrid_pk: &HybridPublicKey) -> Vec<u8> {
    let mut out = vec![tag, suite.pqc_alg.wire_tag(), suite.aead_alg.wire_tag()];
    out.extend_from_slice(&hybrid_pk.to_bytes());
    out
}

fn decode_suite_and_key(rest: &[u8]) -> ChannelResult<(Suite, HybridPublicKey)> {
    if rest.len() < 2 {
        return Err(ChannelError::BadInput("truncated suite header".into()));
    }
    let pqc_alg = PqcAlg::from_wire_tag(rest[0])
        .ok_or_else(|| ChannelError::BadInput(format!("unknown PQC tag {}", rest[0])))?;
    let aead_alg = AeadAlg::from_wire_tag(rest[1])
        .ok_or_else(|| ChannelError::BadInput(format!("unknown AEAD tag {}", rest[1])))?;
    let hybrid_pk = HybridPublicKey::from_bytes(&rest[2..])
        .map_err(|e| ChannelError::BadInput(format!("bad hybrid public key: {e}")))?;
    Ok((Suite { pqc_alg, aead_alg }, hybrid_pk))
}

/// A data-phase message. The sender emits exactly `Header`, then zero or
/// more `Chunk`, then one `Trailer`, then `CloseStream`; the receiver
/// rejects any other type or ordering as a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMessage {
    Header(Vec<u8>),
    Chunk(Vec<u8>),
    Trailer(Vec<u8>),
    CloseStream,
}

impl DataMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DataMessage::Header(bytes) => with_tag(TAG_STREAM_HEADER, bytes),
            DataMessage::Chunk(bytes) => with_tag(TAG_CHUNK, bytes),
            DataMessage::Trailer(bytes) => with_tag(TAG_TRAILER, bytes),
            DataMessage::CloseStream => vec![TAG_CLOSE_STREAM],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> ChannelResult<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| ChannelError::BadInput("empty data message".into()))?;
        match tag {
            TAG_STREAM_HEADER => Ok(DataMessage::Header(rest.to_vec())),
            TAG_CHUNK => Ok(DataMessage::Chunk(rest.to_vec())),
            TAG_TRAILER => Ok(DataMessage::Trailer(rest.to_vec())),
            TAG_CLOSE_STREAM => Ok(DataMessage::CloseStream),
            other => Err(ChannelError::Protocol(format!("unknown data message tag {other:#x}"))),
        }
    }
}

fn with_tag(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(tag);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqc_crypto::hybrid::generate_keypair;

    #[test]
    fn hello_round_trips() {
        let (pk, _sk) = generate_keypair(PqcAlg::MlKem768).unwrap();
        let suite = Suite { pqc_alg: PqcAlg::MlKem768, aead_alg: AeadAlg::Aes256Gcm };
        let msg = HandshakeMessage::Hello { suite, hybrid_pk: pk };
        let bytes = msg.to_bytes();
        assert_eq!(HandshakeMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn suite_rejected_round_trips() {
        let msg = HandshakeMessage::SuiteRejected { reason: "unsupported suite".into() };
        let bytes = msg.to_bytes();
        assert_eq!(HandshakeMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn finish_round_trips() {
        let msg = HandshakeMessage::Finish { mac: [0x5A; 32] };
        let bytes = msg.to_bytes();
        assert_eq!(HandshakeMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn data_messages_round_trip() {
        for msg in [
            DataMessage::Header(vec![1, 2, 3]),
            DataMessage::Chunk(vec![4, 5, 6]),
            DataMessage::Trailer(vec![7, 8]),
            DataMessage::CloseStream,
        ] {
            let bytes = msg.to_bytes();
            assert_eq!(DataMessage::from_bytes(&bytes).unwrap(), msg);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(HandshakeMessage::from_bytes(&[0xEE]).is_err());
        assert!(DataMessage::from_bytes(&[0xEE]).is_err());
    }

    #[test]
    fn empty_message_is_rejected() {
        assert!(HandshakeMessage::from_bytes(&[]).is_err());
        assert!(DataMessage::from_bytes(&[]).is_err());
    }
}
