//! Hybrid PQC Secure Transfer.
//!
//! Ties together the hybrid KEM ([`pqc_crypto`]), the chunked AEAD
//! container codec ([`pqc_container`]), the secure channel handshake and
//! data phase ([`pqc_channel`]), and the password-encrypted keystore
//! ([`pqc_keystore`]) into the system spec.md describes. This crate itself
//! adds no new protocol surface: it re-exports the pieces for a single
//! `use pqc_transfer::...` entry point and hosts the cross-crate
//! end-to-end tests under `tests/`.

pub use pqc_channel::{
    noop_events, ChannelError, ChannelResult, DuplexTransport, InMemoryTransport, NoopEvents,
    Session, SessionConfig, SessionConfigError, SessionEvents, TracingEvents,
};
pub use pqc_container::{CodecError, CodecResult, ContainerHeader, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use pqc_crypto::hybrid::{generate_keypair, HybridPublicKey, HybridSecretKey};
pub use pqc_crypto::{CryptoError, CryptoResult};
pub use pqc_keystore::{
    validate_key_id, KeyMetadata, KeyStore, KeystoreError, KeystoreResult, StoredKey,
    StoredPrivateKey, StoredPublicKey,
};
pub use pqc_types::{AeadAlg, ErrorCode, PqcAlg, Suite};

/// Establish a pair of sessions over a fresh in-memory transport, one side
/// acting as initiator and the other as responder, both offering `suite`.
/// Convenience wiring for tests and the demo CLI -- not a protocol
/// operation of its own.
pub async fn establish_in_memory_pair(
    suite: Suite,
    config: SessionConfig,
) -> ChannelResult<(Session<InMemoryTransport>, Session<InMemoryTransport>)> {
    let (transport_i, transport_r) = InMemoryTransport::pair(64);
    let initiator_keypair = generate_keypair(suite.pqc_alg)?;

    let initiator = tokio::spawn(async move {
        Session::establish_initiator(transport_i, &initiator_keypair, config, noop_events()).await
    });
    let responder = tokio::spawn(async move {
        Session::establish_responder(
            transport_r,
            &[suite],
            |s| Ok(generate_keypair(s.pqc_alg)?),
            config,
            noop_events(),
        )
        .await
    });

    let initiator = initiator.await.map_err(|_| ChannelError::TransportClosed)??;
    let responder = responder.await.map_err(|_| ChannelError::TransportClosed)??;
    Ok((initiator, responder))
}
