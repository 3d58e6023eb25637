//! Secure-channel session: drives the handshake, then frames an encrypted
//! stream of chunks over the transport per spec.md section 4.4's data
//! phase.
//!
//! A sender emits the container header as one message, then one message
//! per chunk, then the trailer, then `CLOSE_STREAM`; the receiver accepts
//! exactly that sequence. Decrypted plaintext is buffered and only handed
//! to the caller's writer once the trailer's digest has verified, so a
//! tampered or truncated stream never leaves partially-decrypted bytes
//! with the application (the "strong" delivery mode spec.md section 4.4
//! calls out as the one its testable properties require).

use crate::config::SessionConfig;
use crate::error::{ChannelError, ChannelResult};
use crate::events::{NoopEvents, SessionEvents};
use crate::handshake::{self, HandshakeOutcome};
use crate::message::DataMessage;
use crate::transport::DuplexTransport;
use pqc_container::{StreamDecoder, StreamEncoder};
use pqc_crypto::hybrid::{HybridPublicKey, HybridSecretKey};
use pqc_crypto::kdf::SessionKey;
use pqc_types::Suite;
use std::io::{self, Read, Write};
use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Aborted,
    Closed,
}

/// A secure channel session bound to one transport and one derived
/// session key. Owns its transport, its handshake state, and its session
/// key; nothing here is shared with any other session.
pub struct Session<T: DuplexTransport> {
    transport: T,
    session_key: Option<SessionKey>,
    suite: Suite,
    config: SessionConfig,
    events: Arc<dyn SessionEvents>,
    cancellation: CancellationToken,
    state: SessionState,
}

impl<T: DuplexTransport> Session<T> {
    /// Run the initiator side of the handshake over `transport` and return
    /// an established session ready for the data phase.
    pub async fn establish_initiator(
        mut transport: T,
        own_keypair: &(HybridPublicKey, HybridSecretKey),
        config: SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> ChannelResult<Self> {
        config.validate().map_err(|e| ChannelError::BadInput(e.to_string()))?;
        let outcome =
            handshake::run_initiator(&mut transport, own_keypair, config.suite, config.handshake_timeout)
                .await;
        Self::finish_establish(transport, outcome, config, events)
    }

    /// Run the responder side of the handshake over `transport` and return
    /// an established session ready for the data phase.
    pub async fn establish_responder(
        mut transport: T,
        accepted_suites: &[Suite],
        keypair_for_suite: impl FnOnce(Suite) -> ChannelResult<(HybridPublicKey, HybridSecretKey)>,
        config: SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> ChannelResult<Self> {
        config.validate().map_err(|e| ChannelError::BadInput(e.to_string()))?;
        let outcome = handshake::run_responder(
            &mut transport,
            accepted_suites,
            keypair_for_suite,
            config.handshake_timeout,
        )
        .await;
        Self::finish_establish(transport, outcome, config, events)
    }

    fn finish_establish(
        transport: T,
        outcome: ChannelResult<HandshakeOutcome>,
        config: SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> ChannelResult<Self> {
        match outcome {
            Ok(HandshakeOutcome { session_key, suite }) => {
                events.handshake_ok(suite);
                Ok(Self {
                    transport,
                    session_key: Some(session_key),
                    suite,
                    config,
                    events,
                    cancellation: CancellationToken::new(),
                    state: SessionState::Active,
                })
            }
            Err(e) => {
                events.session_failed(e.error_code());
                Err(e)
            }
        }
    }

    /// A token the caller can cancel to abort this session's next
    /// suspension point (transport I/O or a chunk boundary).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    fn session_key_bytes(&self) -> ChannelResult<[u8; 32]> {
        self.session_key
            .as_ref()
            .map(|k| *k.as_bytes())
            .ok_or(ChannelError::TransportClosed)
    }

    /// Abort the session: zeroizes the session key, marks the session
    /// unusable, and reports [`ChannelError::Cancelled`] to the event
    /// sink. The transport is dropped when the session itself is dropped.
    pub fn abort(&mut self) {
        self.session_key = None;
        self.state = SessionState::Aborted;
        self.events.session_failed(pqc_types::ErrorCode::Cancelled);
    }

    fn check_not_cancelled(&self) -> ChannelResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        if self.state != SessionState::Active {
            return Err(ChannelError::TransportClosed);
        }
        Ok(())
    }

    async fn send_data(&mut self, message: DataMessage) -> ChannelResult<()> {
        self.check_not_cancelled()?;
        match timeout(self.config.chunk_inactivity_timeout, self.transport.send(message.to_bytes())).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout),
        }
    }

    async fn recv_data(&mut self) -> ChannelResult<DataMessage> {
        self.check_not_cancelled()?;
        let bytes = match timeout(self.config.chunk_inactivity_timeout, self.transport.recv()).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return Err(ChannelError::TransportClosed),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ChannelError::Timeout),
        };
        DataMessage::from_bytes(&bytes)
    }

    /// Encrypt `reader` and send it as a complete framed stream: header,
    /// data chunks, trailer, `CLOSE_STREAM`.
    pub async fn send_stream<R: Read>(
        &mut self,
        mut reader: R,
        plaintext_length: Option<u64>,
    ) -> ChannelResult<()> {
        let key = self.session_key_bytes()?;
        let chunk_size = self.config.chunk_size;
        let (mut encoder, header) = StreamEncoder::new(key, chunk_size, plaintext_length)?;
        self.send_data(DataMessage::Header(header)).await?;

        let mut buf = vec![0u8; chunk_size as usize];
        let mut index = 0u32;
        loop {
            self.check_not_cancelled()?;
            let n = fill_buf(&mut reader, &mut buf).map_err(pqc_container::CodecError::Io)?;
            if n == 0 {
                break;
            }
            let frame = encoder.encode_chunk(&buf[..n])?;
            self.events.chunk_sealed(index, n);
            index += 1;
            self.send_data(DataMessage::Chunk(frame)).await?;
            if n < buf.len() {
                break;
            }
        }

        let trailer = encoder.finish()?;
        self.send_data(DataMessage::Trailer(trailer)).await?;
        self.send_data(DataMessage::CloseStream).await?;
        Ok(())
    }

    /// Receive a complete framed stream and write its plaintext to
    /// `writer`. Nothing is written to `writer` unless the trailer's
    /// digest verifies; any failure leaves `writer` untouched.
    pub async fn recv_stream<W: Write>(&mut self, mut writer: W) -> ChannelResult<()> {
        let key = self.session_key_bytes()?;

        let header = match self.recv_data().await? {
            DataMessage::Header(bytes) => bytes,
            other => return Err(ChannelError::Protocol(format!("expected stream header, got {other:?}"))),
        };
        let mut decoder = StreamDecoder::new(key, &header)?;

        let mut plaintext = Vec::new();
        let mut index = 0u32;
        loop {
            match self.recv_data().await? {
                DataMessage::Chunk(frame) => {
                    match decoder.decode_chunk(&frame)? {
                        Some(pt) => {
                            self.events.chunk_opened(index, pt.len());
                            index += 1;
                            plaintext.extend_from_slice(&pt);
                        }
                        None => {
                            return Err(ChannelError::Protocol(
                                "trailer authenticated from a CHUNK message".into(),
                            ))
                        }
                    }
                }
                DataMessage::Trailer(frame) => {
                    match decoder.decode_chunk(&frame)? {
                        None => {
                            self.events.trailer_verified();
                            break;
                        }
                        Some(_) => {
                            return Err(ChannelError::Protocol(
                                "data chunk authenticated from a TRAILER message".into(),
                            ))
                        }
                    }
                }
                other => return Err(ChannelError::Protocol(format!("unexpected message {other:?}"))),
            }
        }

        match self.recv_data().await? {
            DataMessage::CloseStream => {}
            other => return Err(ChannelError::Protocol(format!("expected CLOSE_STREAM, got {other:?}"))),
        }

        writer.write_all(&plaintext).map_err(pqc_container::CodecError::Io)?;
        writer.flush().map_err(pqc_container::CodecError::Io)?;
        Ok(())
    }

    /// Gracefully close the session, zeroizing the session key.
    pub fn close(&mut self) {
        self.session_key = None;
        self.state = SessionState::Closed;
    }
}

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

/// Convenience constructor for hosts that don't want to wire in a
/// [`SessionEvents`] sink.
pub fn noop_events() -> Arc<dyn SessionEvents> {
    Arc::new(NoopEvents)
}
