//! Forwarding engine for rust-ndn-lite.
//!
//! This crate holds the single-threaded NDN forwarder: the face table, the
//! FIB and PIT, local prefix handlers, a task scheduler and the key storage
//! used to verify incoming Data. Transports live on tokio tasks and reach
//! the forwarder through [`ChannelFace`]s; the forwarder itself never
//! blocks and is driven by calling [`Forwarder::process`] in a loop.

pub mod clock;
pub mod config;
pub mod face;
pub mod fib;
mod forwarder;
pub mod keys;
pub mod pit;
pub mod scheduler;
pub mod udp;
pub mod unix;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ForwarderConfig;
pub use face::{ChannelFace, Face};
pub use fib::ForwardingStrategy;
pub use forwarder::{Forwarder, InterestHandler, OnData, OnTimeout, PendingCallbacks, Strategy};
pub use keys::KeyStorage;

/// Default local NDN port.
pub const NDN_UDP_PORT: u16 = 6363;

/// Interval between processing passes when the owning loop sleeps.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
