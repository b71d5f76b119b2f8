//! rust-ndn-lite: a lightweight Named Data Networking stack.
//!
//! The workspace is split the way the layers depend on each other:
//!
//! - [`common`]: TLV codec, names, packets, signatures, metrics.
//! - [`forwarder`]: faces, FIB, PIT, scheduler, key storage and the
//!   single-threaded forwarding core.
//! - [`app`]: security bootstrapping, trust schema, pub/sub and service
//!   discovery.

pub use rust_ndn_lite_app as app;
pub use rust_ndn_lite_common as common;
pub use rust_ndn_lite_forwarder as forwarder;

pub use rust_ndn_lite_common::{Data, Error, Interest, Name, NameComponent, Result};
pub use rust_ndn_lite_forwarder::{Forwarder, ForwarderConfig, Strategy};
