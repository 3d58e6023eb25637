//! Secure-channel handshake and data-phase framing over an abstract
//! duplex transport.
//!
//! Combines the hybrid KEM ([`pqc_crypto`]) and the chunked AEAD codec
//! ([`pqc_container`]) into a two-round handshake followed by a framed,
//! authenticated data stream, per spec.md section 4.4. The transport
//! itself ([`transport::DuplexTransport`]) is an external collaborator:
//! this crate only assumes ordered, non-duplicated delivery of discrete
//! messages, never opening a socket itself.

pub mod config;
pub mod error;
pub mod events;
pub mod handshake;
pub mod message;
pub mod session;
pub mod transport;

pub use config::{SessionConfig, SessionConfigError};
pub use error::{ChannelError, ChannelResult};
pub use events::{NoopEvents, SessionEvents, TracingEvents};
pub use handshake::HandshakeOutcome;
pub use message::{DataMessage, HandshakeMessage};
pub use session::{noop_events, Session};
pub use transport::{DuplexTransport, InMemoryTransport};
