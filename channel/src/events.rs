//! Pure session-event callbacks.
//!
//! A session reports its own lifecycle through this trait rather than
//! through a process-wide metrics/audit singleton, so a host can wire in
//! whatever observability backend it wants (or none) without the channel
//! crate depending on it.

use pqc_types::{ErrorCode, Suite};

pub trait SessionEvents: Send + Sync {
    fn handshake_ok(&self, _suite: Suite) {}
    fn chunk_sealed(&self, _index: u32, _bytes: usize) {}
    fn chunk_opened(&self, _index: u32, _bytes: usize) {}
    fn trailer_verified(&self) {}
    fn session_failed(&self, _code: ErrorCode) {}
}

/// Default no-op implementation for hosts that don't care about events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

/// Logs every event via `tracing` at a level appropriate to its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl SessionEvents for TracingEvents {
    fn handshake_ok(&self, suite: Suite) {
        tracing::info!(%suite, "handshake_ok");
    }

    fn chunk_sealed(&self, index: u32, bytes: usize) {
        tracing::debug!(index, bytes, "chunk_sealed");
    }

    fn chunk_opened(&self, index: u32, bytes: usize) {
        tracing::debug!(index, bytes, "chunk_opened");
    }

    fn trailer_verified(&self) {
        tracing::info!("trailer_verified");
    }

    fn session_failed(&self, code: ErrorCode) {
        tracing::warn!(error_code = %code, "session_failed");
    }
}
