//! Error types for the rust-ndn-lite engine.

use thiserror::Error;

/// All possible errors that can occur within the engine.
///
/// Packet-level variants (`MalformedPacket`, `VerificationFailure`,
/// `Transport`, `RouteNotFound`) are handled locally by the forwarder and
/// never escape its processing loop. `BootstrappingFailure` is the only
/// variant that is escalated to the owning application as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Error related to TLV encoding/decoding.
    #[error("TLV error: {0}")]
    Tlv(String),

    /// A packet was truncated, oversized or structurally invalid.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A digest or signature did not match.
    #[error("verification failure: {0}")]
    VerificationFailure(String),

    /// A face failed to send or receive.
    #[error("transport error: {0}")]
    Transport(String),

    /// No FIB entry and no local handler matched an Interest.
    #[error("no route for {0}")]
    RouteNotFound(String),

    /// The pending interest table is at capacity.
    #[error("pending interest table is full")]
    PitFull,

    /// The Interest nonce was already seen for the same pending entry.
    #[error("duplicate nonce {0:#010x}")]
    DuplicateNonce(u32),

    /// Security bootstrapping could not complete.
    #[error("bootstrapping failure: {0}")]
    BootstrappingFailure(String),

    /// A packet was rejected by the trust schema.
    #[error("trust schema rejected: {0}")]
    TrustSchema(String),

    /// A name could not be parsed or exceeds the engine limits.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A cryptographic primitive failed (bad key material, etc.).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A table or registry ran out of room.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Whether this error was caused by bad bytes on the wire.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Tlv(_) | Error::MalformedPacket(_))
    }
}
