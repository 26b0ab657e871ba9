//! Foundation types for Strata.
//!
//! This crate provides the core temporal and structural types used
//! throughout the Strata storage core. Every other Strata crate depends on
//! `strata-types`.
//!
//! # Key Types
//!
//! - [`Timestamp`] — Nanosecond-resolution mutation timestamp
//! - [`MonotonicClock`] — Strictly increasing wall-clock timestamp source
//! - [`Digest`] — 32-byte content hash, hex-encoded at the wire boundary
//! - [`ValueState`] — A value or a deletion tombstone in a key's history
//! - [`MutationKind`] — SET / DELETE classification of a mutation

pub mod digest;
pub mod error;
pub mod record;
pub mod temporal;

pub use digest::Digest;
pub use error::TypeError;
pub use record::{MutationKind, ValueState};
pub use temporal::{MonotonicClock, Timestamp};
