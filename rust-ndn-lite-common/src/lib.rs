//! Common types and utilities for the rust-ndn-lite named-data engine.
//!
//! This crate provides the pieces shared by the forwarder and the
//! application layers: the TLV codec, names, Interest and Data packets,
//! packet signing and verification, metrics and identifier types.

pub mod error;
pub mod metrics;
pub mod name;
pub mod ndn;
pub mod security;
pub mod tlv;
pub mod types;

/// Reexport of common types
pub use error::Error;
pub use name::{Name, NameComponent};
pub use ndn::{ContentType, Data, Interest, MetaInfo, Signature, SignatureInfo, SignatureType};
pub type Result<T> = std::result::Result<T, Error>;
