//! Forwarder configuration.
//!
//! Every field has a default so that partial configuration files and
//! environment overrides deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizing and timing knobs of a [`Forwarder`](crate::Forwarder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Maximum number of pending Interest entries.
    pub pit_capacity: usize,

    /// Maximum number of FIB prefixes.
    pub fib_capacity: usize,

    /// Maximum number of attached faces.
    pub face_capacity: usize,

    /// Packets read from each face in one processing pass.
    pub max_packets_per_face: usize,

    /// Lifetime used by helpers that build Interests on behalf of
    /// applications (in milliseconds).
    pub default_interest_lifetime_ms: u64,

    /// Received packets larger than this are dropped.
    pub max_packet_size: usize,

    /// Nonces remembered per pending entry for loop detection.
    pub nonce_history: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            pit_capacity: 256,
            fib_capacity: 128,
            face_capacity: 16,
            max_packets_per_face: 16,
            default_interest_lifetime_ms: 4000,
            max_packet_size: rust_ndn_lite_common::ndn::MAX_NDN_PACKET_SIZE,
            nonce_history: 8,
        }
    }
}

impl ForwarderConfig {
    pub fn default_interest_lifetime(&self) -> Duration {
        Duration::from_millis(self.default_interest_lifetime_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ForwarderConfig = serde_json::from_str(r#"{"pit_capacity": 4}"#).unwrap();
        assert_eq!(config.pit_capacity, 4);
        assert_eq!(config.fib_capacity, 128);
        assert_eq!(config.max_packet_size, 8800);
        assert_eq!(config.default_interest_lifetime(), Duration::from_secs(4));
    }
}
