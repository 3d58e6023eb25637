//! Shared wire-level algorithm tags and error codes for the hybrid
//! PQC transfer core.
//!
//! This crate has no cryptographic logic of its own -- it is the common
//! vocabulary `pqc-crypto`, `pqc-container`, `pqc-channel`, and
//! `pqc-keystore` share so that error reporting and suite negotiation
//! stay consistent across crate boundaries.

mod algorithm;
mod error_code;

pub use algorithm::{AeadAlg, PqcAlg, Suite};
pub use error_code::ErrorCode;
