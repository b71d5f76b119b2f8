//! Application layers on top of the rust-ndn-lite forwarder.
//!
//! - [`bootstrap`] and [`controller`]: the two sides of security
//!   bootstrapping, turning a factory key and a shared secret into a
//!   certificate issued by the home's trust anchor.
//! - [`trust_schema`]: name-pattern rules deciding which keys may sign
//!   which Data.
//! - [`pubsub`]: content and command publish/subscribe per service.
//! - [`discovery`]: advertising the services a device provides.
//!
//! Every handle here is cheap to clone and shares its state, so it can be
//! captured by the forwarder callbacks it registers.

pub mod bootstrap;
pub mod controller;
pub mod discovery;
pub mod identity;
pub mod pubsub;
pub mod service;
pub mod trust_schema;

pub use bootstrap::{BootstrapConfig, BootstrapHandle, BootstrapInfo, BootstrapState, Bootstrapper};
pub use controller::{BootstrapController, DeviceRecord};
pub use discovery::{SelfService, ServiceDiscovery};
pub use identity::DeviceIdentity;
pub use pubsub::{Event, EventContext, PubSub};
pub use service::ServiceId;
pub use trust_schema::{NamePattern, TrustSchema, TrustSchemaRule};
