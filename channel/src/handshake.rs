//! The two-round, symmetric-roles handshake (M1-M6) from spec.md section 4.4.
//!
//! ```text
//!                Initiator                         Responder
//! M1: HELLO     -> { hybrid_pk_I, suite }     ->
//! M2:                                         <-    { hybrid_pk_R, accepted_suite }
//! M3: KEY_EXCH  -> { encap_I->R }             ->
//! M4:                                         <-    { encap_R->I }
//! M5: FINISH    -> { hmac(session_key, "I|finish") } ->
//! M6:                                         <-    { hmac(session_key, "R|finish") }
//! ```
//!
//! After M3/M4 both sides hold two 64-byte secrets: their own `encapsulate`
//! output and their peer's `encap` decapsulated with their own secret key.
//! XORing those two buffers before deriving the session key makes the
//! result order-independent without either side being able to bias it
//! alone, given the KEM's IND-CCA security.

use crate::error::{ChannelError, ChannelResult};
use crate::message::HandshakeMessage;
use crate::transport::DuplexTransport;
use hmac::{Hmac, Mac};
use pqc_crypto::hybrid::{self, HybridPublicKey, HybridSecretKey, SharedSecret};
use pqc_crypto::kdf::{derive_session_key, SessionKey};
use pqc_types::Suite;
use sha2::Sha256;
use tokio::time::timeout;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

const ROLE_INITIATOR: &str = "I";
const ROLE_RESPONDER: &str = "R";

/// Outcome of a completed handshake: the derived session key and the
/// suite both sides confirmed.
pub struct HandshakeOutcome {
    pub session_key: SessionKey,
    pub suite: Suite,
}

async fn send_handshake(
    transport: &mut dyn DuplexTransport,
    message: &HandshakeMessage,
) -> ChannelResult<()> {
    transport.send(message.to_bytes()).await
}

async fn recv_handshake(transport: &mut dyn DuplexTransport) -> ChannelResult<HandshakeMessage> {
    let bytes = transport.recv().await?.ok_or(ChannelError::TransportClosed)?;
    HandshakeMessage::from_bytes(&bytes)
}

fn xor_secrets(a: &SharedSecret, b: &SharedSecret) -> SharedSecret {
    let mut combined = [0u8; 64];
    for i in 0..64 {
        combined[i] = a.as_bytes()[i] ^ b.as_bytes()[i];
    }
    let secret = SharedSecret(combined);
    combined.zeroize();
    secret
}

fn finish_mac(session_key: &SessionKey, role: &str) -> ChannelResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(session_key.as_bytes())
        .map_err(|e| ChannelError::BadInput(format!("bad session key length: {e}")))?;
    mac.update(role.as_bytes());
    mac.update(b"|finish");
    Ok(mac.finalize().into_bytes().into())
}

fn verify_finish_mac(session_key: &SessionKey, role: &str, mac: &[u8; 32]) -> ChannelResult<()> {
    let mut verifier = HmacSha256::new_from_slice(session_key.as_bytes())
        .map_err(|e| ChannelError::BadInput(format!("bad session key length: {e}")))?;
    verifier.update(role.as_bytes());
    verifier.update(b"|finish");
    verifier
        .verify_slice(mac)
        .map_err(|_| ChannelError::HandshakeAuthFailed)
}

/// Run the initiator side of the handshake (M1, M3, M5) against `transport`.
///
/// `own_keypair` must already be generated for `suite.pqc_alg`. Fails with
/// [`ChannelError::Negotiation`] if the responder rejects the suite, with
/// [`ChannelError::HandshakeAuthFailed`] if confirmation MACs disagree, and
/// with [`ChannelError::Timeout`] if the whole exchange exceeds
/// `handshake_timeout`.
pub async fn run_initiator(
    transport: &mut dyn DuplexTransport,
    own_keypair: &(HybridPublicKey, HybridSecretKey),
    suite: Suite,
    handshake_timeout: std::time::Duration,
) -> ChannelResult<HandshakeOutcome> {
    timeout(handshake_timeout, run_initiator_inner(transport, own_keypair, suite))
        .await
        .map_err(|_| ChannelError::Timeout)?
}

async fn run_initiator_inner(
    transport: &mut dyn DuplexTransport,
    (own_pk, own_sk): &(HybridPublicKey, HybridSecretKey),
    suite: Suite,
) -> ChannelResult<HandshakeOutcome> {
    // M1
    send_handshake(transport, &HandshakeMessage::Hello { suite, hybrid_pk: own_pk.clone() }).await?;

    // M2
    let (accepted_suite, peer_pk) = match recv_handshake(transport).await? {
        HandshakeMessage::HelloAck { suite: accepted, hybrid_pk } => (accepted, hybrid_pk),
        HandshakeMessage::SuiteRejected { reason } => {
            return Err(ChannelError::Negotiation(reason));
        }
        other => return Err(ChannelError::Protocol(format!("expected HELLO_ACK, got {other:?}"))),
    };
    if accepted_suite != suite {
        return Err(ChannelError::Negotiation(format!(
            "responder accepted {accepted_suite} but we offered {suite}"
        )));
    }

    // M3
    let (encap_mine, secret_mine) = hybrid::encapsulate(&peer_pk)?;
    send_handshake(transport, &HandshakeMessage::Encap { encap: encap_mine }).await?;

    // M4
    let encap_peer = match recv_handshake(transport).await? {
        HandshakeMessage::Encap { encap } => encap,
        other => return Err(ChannelError::Protocol(format!("expected ENCAP, got {other:?}"))),
    };
    let secret_peer = hybrid::decapsulate(own_sk, &encap_peer)?;

    let combined = xor_secrets(&secret_mine, &secret_peer);
    let session_key = derive_session_key(&combined)?;

    // M5
    let mac_mine = finish_mac(&session_key, ROLE_INITIATOR)?;
    send_handshake(transport, &HandshakeMessage::Finish { mac: mac_mine }).await?;

    // M6
    match recv_handshake(transport).await? {
        HandshakeMessage::Finish { mac } => verify_finish_mac(&session_key, ROLE_RESPONDER, &mac)?,
        other => return Err(ChannelError::Protocol(format!("expected FINISH, got {other:?}"))),
    }

    tracing::info!(suite = %suite, "handshake_ok (initiator)");
    Ok(HandshakeOutcome { session_key, suite: accepted_suite })
}

/// Run the responder side of the handshake (M2, M4, M6) against `transport`.
///
/// `keypair_for_suite` is called with the suite the initiator offered so
/// the responder can generate a matching hybrid key pair; it is only
/// invoked for a suite in `accepted_suites`. Rejects any other suite with
/// `SUITE_REJECTED` and returns [`ChannelError::Negotiation`].
pub async fn run_responder(
    transport: &mut dyn DuplexTransport,
    accepted_suites: &[Suite],
    keypair_for_suite: impl FnOnce(Suite) -> ChannelResult<(HybridPublicKey, HybridSecretKey)>,
    handshake_timeout: std::time::Duration,
) -> ChannelResult<HandshakeOutcome> {
    timeout(
        handshake_timeout,
        run_responder_inner(transport, accepted_suites, keypair_for_suite),
    )
    .await
    .map_err(|_| ChannelError::Timeout)?
}

async fn run_responder_inner(
    transport: &mut dyn DuplexTransport,
    accepted_suites: &[Suite],
    keypair_for_suite: impl FnOnce(Suite) -> ChannelResult<(HybridPublicKey, HybridSecretKey)>,
) -> ChannelResult<HandshakeOutcome> {
    // M1
    let (offered_suite, peer_pk) = match recv_handshake(transport).await? {
        HandshakeMessage::Hello { suite, hybrid_pk } => (suite, hybrid_pk),
        other => return Err(ChannelError::Protocol(format!("expected HELLO, got {other:?}"))),
    };

    if !accepted_suites.contains(&offered_suite) {
        let reason = format!("suite {offered_suite} not in accepted set");
        send_handshake(transport, &HandshakeMessage::SuiteRejected { reason: reason.clone() }).await?;
        return Err(ChannelError::Negotiation(reason));
    }

    let (own_pk, own_sk) = keypair_for_suite(offered_suite)?;

    // M2
    send_handshake(
        transport,
        &HandshakeMessage::HelloAck { suite: offered_suite, hybrid_pk: own_pk.clone() },
    )
    .await?;

    // M3
    let encap_peer = match recv_handshake(transport).await? {
        HandshakeMessage::Encap { encap } => encap,
        other => return Err(ChannelError::Protocol(format!("expected ENCAP, got {other:?}"))),
    };
    let secret_peer = hybrid::decapsulate(&own_sk, &encap_peer)?;

    // M4
    let (encap_mine, secret_mine) = hybrid::encapsulate(&peer_pk)?;
    send_handshake(transport, &HandshakeMessage::Encap { encap: encap_mine }).await?;

    let combined = xor_secrets(&secret_mine, &secret_peer);
    let session_key = derive_session_key(&combined)?;

    // M5
    match recv_handshake(transport).await? {
        HandshakeMessage::Finish { mac } => verify_finish_mac(&session_key, ROLE_INITIATOR, &mac)?,
        other => return Err(ChannelError::Protocol(format!("expected FINISH, got {other:?}"))),
    }

    // M6
    let mac_mine = finish_mac(&session_key, ROLE_RESPONDER)?;
    send_handshake(transport, &HandshakeMessage::Finish { mac: mac_mine }).await?;

    tracing::info!(suite = %offered_suite, "handshake_ok (responder)");
    Ok(HandshakeOutcome { session_key, suite: offered_suite })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use pqc_types::AeadAlg;
    use pqc_types::PqcAlg;

    fn suite(alg: PqcAlg) -> Suite {
        Suite { pqc_alg: alg, aead_alg: AeadAlg::Aes256Gcm }
    }

    #[tokio::test]
    async fn matching_suites_agree_on_a_session_key() {
        let (mut t_i, mut t_r) = InMemoryTransport::pair(8);
        let s = suite(PqcAlg::MlKem768);
        let kp_i = hybrid::generate_keypair(s.pqc_alg).unwrap();

        let initiator = tokio::spawn(async move {
            run_initiator(&mut t_i, &kp_i, s, std::time::Duration::from_secs(5)).await
        });
        let responder = tokio::spawn(async move {
            run_responder(
                &mut t_r,
                &[s],
                |suite| Ok(hybrid::generate_keypair(suite.pqc_alg)?),
                std::time::Duration::from_secs(5),
            )
            .await
        });

        let outcome_i = initiator.await.unwrap().unwrap();
        let outcome_r = responder.await.unwrap().unwrap();
        assert_eq!(outcome_i.session_key.as_bytes(), outcome_r.session_key.as_bytes());
        assert_eq!(outcome_i.suite, s);
        assert_eq!(outcome_r.suite, s);
    }

    #[tokio::test]
    async fn rejected_suite_aborts_both_sides_without_a_session_key() {
        let (mut t_i, mut t_r) = InMemoryTransport::pair(8);
        let offered = suite(PqcAlg::MlKem1024);
        let accepted = suite(PqcAlg::MlKem768);
        let kp_i = hybrid::generate_keypair(offered.pqc_alg).unwrap();

        let initiator = tokio::spawn(async move {
            run_initiator(&mut t_i, &kp_i, offered, std::time::Duration::from_secs(5)).await
        });
        let responder = tokio::spawn(async move {
            run_responder(
                &mut t_r,
                &[accepted],
                |suite| Ok(hybrid::generate_keypair(suite.pqc_alg)?),
                std::time::Duration::from_secs(5),
            )
            .await
        });

        let result_i = initiator.await.unwrap();
        let result_r = responder.await.unwrap();
        assert!(matches!(result_i, Err(ChannelError::Negotiation(_))));
        assert!(matches!(result_r, Err(ChannelError::Negotiation(_))));
    }

    #[tokio::test]
    async fn tampered_finish_mac_is_caught() {
        let (mut t_i, mut t_r) = InMemoryTransport::pair(8);
        let s = suite(PqcAlg::MlKem512);
        let kp_i = hybrid::generate_keypair(s.pqc_alg).unwrap();

        // Responder that flips a bit in its own confirmation MAC.
        let responder = tokio::spawn(async move {
            let (offered_suite, peer_pk) = match recv_handshake(&mut t_r).await.unwrap() {
                HandshakeMessage::Hello { suite, hybrid_pk } => (suite, hybrid_pk),
                _ => panic!("expected HELLO"),
            };
            let (own_pk, own_sk) = hybrid::generate_keypair(offered_suite.pqc_alg).unwrap();
            send_handshake(
                &mut t_r,
                &HandshakeMessage::HelloAck { suite: offered_suite, hybrid_pk: own_pk },
            )
            .await
            .unwrap();
            let encap_peer = match recv_handshake(&mut t_r).await.unwrap() {
                HandshakeMessage::Encap { encap } => encap,
                _ => panic!("expected ENCAP"),
            };
            let secret_peer = hybrid::decapsulate(&own_sk, &encap_peer).unwrap();
            let (encap_mine, secret_mine) = hybrid::encapsulate(&peer_pk).unwrap();
            send_handshake(&mut t_r, &HandshakeMessage::Encap { encap: encap_mine }).await.unwrap();
            let combined = xor_secrets(&secret_mine, &secret_peer);
            let session_key = derive_session_key(&combined).unwrap();
            let _ = recv_handshake(&mut t_r).await.unwrap();
            let mut bad_mac = finish_mac(&session_key, ROLE_RESPONDER).unwrap();
            bad_mac[0] ^= 0xFF;
            send_handshake(&mut t_r, &HandshakeMessage::Finish { mac: bad_mac }).await.unwrap();
        });

        let result = run_initiator(&mut t_i, &kp_i, s, std::time::Duration::from_secs(5)).await;
        responder.await.unwrap();
        assert!(matches!(result, Err(ChannelError::HandshakeAuthFailed)));
    }
}
