//! Service identifiers.
//!
//! A service is named by a single-byte component right after the home
//! prefix, e.g. `/<home>/<LED>/CMD/...`.

use rust_ndn_lite_common::NameComponent;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub u8);

impl ServiceId {
    pub const AC: ServiceId = ServiceId(0);
    pub const LED: ServiceId = ServiceId(1);
    pub const TEMP: ServiceId = ServiceId(2);
    pub const LOCK: ServiceId = ServiceId(3);
    pub const DOOR: ServiceId = ServiceId(4);
    pub const MOTION: ServiceId = ServiceId(5);
    pub const SMOKE: ServiceId = ServiceId(6);
    pub const OCCUPANCY: ServiceId = ServiceId(7);

    pub fn component(self) -> NameComponent {
        NameComponent::new(vec![self.0])
    }

    pub fn from_component(component: &NameComponent) -> Option<Self> {
        match component.as_bytes().as_ref() {
            [id] => Some(ServiceId(*id)),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            ServiceId::AC => "AC",
            ServiceId::LED => "LED",
            ServiceId::TEMP => "TEMP",
            ServiceId::LOCK => "LOCK",
            ServiceId::DOOR => "DOOR",
            ServiceId::MOTION => "MOTION",
            ServiceId::SMOKE => "SMOKE",
            ServiceId::OCCUPANCY => "OCCUPANCY",
            ServiceId(other) => return write!(f, "service-{}", other),
        };
        f.write_str(label)
    }
}
