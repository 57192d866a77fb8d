//! Foundation types for keyfile.
//!
//! This crate provides the identity, versioning and temporal types shared by
//! the schema, codec and store crates. It has no knowledge of directories or
//! payloads; those live in `keyfile-store`.
//!
//! # Key Types
//!
//! - [`KeyId`] -- Document-unique, monotonically increasing key identity
//! - [`KeyCounter`] -- Allocator that hands out [`KeyId`]s and never reuses them
//! - [`Cycle`] -- Per-(directory, name) write sequence number, starting at 1
//! - [`KeyName`] -- A key name with an optional `;cycle` selector
//! - [`Datime`] -- Second-resolution timestamp in `YYYY-MM-DD HH:MM:SS` form
//! - [`DocumentUuid`] -- Stable identity of one persisted document
//!
//! The [`format`] module names every JSON field of the on-disk layout.

pub mod error;
pub mod format;
pub mod identity;
pub mod temporal;

pub use error::TypeError;
pub use identity::{Cycle, DocumentUuid, KeyCounter, KeyId, KeyName};
pub use temporal::Datime;
