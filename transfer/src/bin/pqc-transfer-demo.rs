//! Demo CLI: hybrid PQC secure transfer over an in-memory transport.
//!
//! Not a network tool -- the abstract `DuplexTransport` this system speaks
//! to is someone else's concern (spec.md's Non-goals exclude transport
//! choice). This binary exists to exercise the handshake and data phase
//! end to end from the command line, the way `wraith-cli` exercises its
//! own protocol stack.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pqc_transfer::{
    establish_in_memory_pair, AeadAlg, KeyStore, PqcAlg, SessionConfig, StoredKey, StoredPrivateKey,
    StoredPublicKey, Suite,
};
use std::io::Cursor;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pqc-transfer-demo", about = "Hybrid PQC secure transfer demo", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt `input` and decrypt it back over an in-memory session,
    /// printing whether the round trip matched.
    Transfer {
        /// File to send. Reads from memory if omitted, sending a sample payload.
        input: Option<PathBuf>,
        /// ML-KEM parameter set to negotiate.
        #[arg(long, default_value = "ml-kem-768")]
        suite: String,
    },
    /// Generate a hybrid key pair and store it in a password-protected
    /// keystore directory.
    KeystoreInit {
        dir: PathBuf,
        password: String,
        key_id: String,
        #[arg(long, default_value = "ml-kem-768")]
        suite: String,
    },
    /// List the keys in a keystore directory.
    KeystoreList { dir: PathBuf, password: String },
}

fn parse_suite(name: &str) -> Result<PqcAlg> {
    match name {
        "ml-kem-512" => Ok(PqcAlg::MlKem512),
        "ml-kem-768" => Ok(PqcAlg::MlKem768),
        "ml-kem-1024" => Ok(PqcAlg::MlKem1024),
        other => anyhow::bail!("unknown suite '{other}', expected ml-kem-512/768/1024"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Transfer { input, suite } => run_transfer(input, &suite).await,
        Command::KeystoreInit { dir, password, key_id, suite } => {
            run_keystore_init(dir, &password, &key_id, &suite)
        }
        Command::KeystoreList { dir, password } => run_keystore_list(dir, &password),
    }
}

async fn run_transfer(input: Option<PathBuf>, suite_name: &str) -> Result<()> {
    let pqc_alg = parse_suite(suite_name)?;
    let suite = Suite { pqc_alg, aead_alg: AeadAlg::Aes256Gcm };

    let payload = match &input {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => b"hybrid PQC secure transfer demo payload".to_vec(),
    };

    let (mut sender, mut receiver) =
        establish_in_memory_pair(suite, SessionConfig { suite, ..SessionConfig::default() })
            .await
            .context("establishing session")?;
    tracing::info!(suite = %suite.pqc_alg, bytes = payload.len(), "handshake complete, sending stream");

    let payload_len = payload.len() as u64;
    let payload_for_send = payload.clone();
    let send = tokio::spawn(async move {
        sender.send_stream(Cursor::new(payload_for_send), Some(payload_len)).await
    });

    let mut received = Vec::new();
    receiver.recv_stream(&mut received).await.context("receiving stream")?;
    send.await.expect("sender task panicked").context("sending stream")?;

    if received == payload {
        println!("round trip ok: {} bytes", received.len());
    } else {
        anyhow::bail!("round trip mismatch: sent {} bytes, received {}", payload.len(), received.len());
    }
    Ok(())
}

fn run_keystore_init(dir: PathBuf, password: &str, key_id: &str, suite_name: &str) -> Result<()> {
    let pqc_alg = parse_suite(suite_name)?;
    let store = KeyStore::open(&dir, password).context("opening keystore")?;
    let (public, secret) = pqc_transfer::generate_keypair(pqc_alg).context("generating key pair")?;
    let key = StoredKey {
        key_id: key_id.to_string(),
        algorithm: pqc_alg,
        public_key: StoredPublicKey { classical_pk: public.classical_pk, pqc_pk: public.pqc_pk },
        private_key: Some(StoredPrivateKey {
            classical_sk: secret.classical_sk_for_storage(),
            pqc_sk: secret.pqc_sk_for_storage().to_vec(),
        }),
        created_at: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        metadata: Default::default(),
    };
    store.store(&key).context("storing key")?;
    let fingerprint = store.get_key_fingerprint(key_id)?;
    println!("stored '{key_id}' ({suite_name}), fingerprint {fingerprint}");
    Ok(())
}

fn run_keystore_list(dir: PathBuf, password: &str) -> Result<()> {
    let store = KeyStore::open(&dir, password).context("opening keystore")?;
    for meta in store.list()? {
        println!("{}\t{}\tcreated_at={}", meta.key_id, meta.algorithm, meta.created_at);
    }
    Ok(())
}
