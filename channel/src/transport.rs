//! Abstract duplex message transport.
//!
//! The secure channel never opens a socket itself: it is handed something
//! that can send and receive whole, length-delimited messages, in order,
//! without duplication. Swapping in a real WebSocket/QUIC/whatever
//! transport means implementing this trait; the handshake and data-phase
//! framing code above it does not change.

use crate::error::{ChannelError, ChannelResult};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A bidirectional channel carrying discrete, length-delimited messages
/// with at-most-once in-order delivery. `recv` returning `Ok(None)` is a
/// clean close signal, not an error.
#[async_trait]
pub trait DuplexTransport: Send {
    async fn send(&mut self, message: Vec<u8>) -> ChannelResult<()>;
    async fn recv(&mut self) -> ChannelResult<Option<Vec<u8>>>;
}

/// An in-process duplex transport backed by a pair of bounded MPSC
/// channels. Used by tests and the in-process demo; a real deployment
/// would implement [`DuplexTransport`] over its actual network link
/// instead.
pub struct InMemoryTransport {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl InMemoryTransport {
    /// Create a connected pair: messages sent on one end arrive on the
    /// other, in order, up to `buffer` messages in flight.
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel(buffer);
        let (tx_b, rx_a) = mpsc::channel(buffer);
        (Self { tx: tx_a, rx: rx_a }, Self { tx: tx_b, rx: rx_b })
    }
}

#[async_trait]
impl DuplexTransport for InMemoryTransport {
    async fn send(&mut self, message: Vec<u8>) -> ChannelResult<()> {
        self.tx.send(message).await.map_err(|_| ChannelError::TransportClosed)
    }

    async fn recv(&mut self) -> ChannelResult<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }
}
