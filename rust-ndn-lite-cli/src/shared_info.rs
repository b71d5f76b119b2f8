//! Factory provisioning file of a device.
//!
//! Four lines: the pre-installed private key (32 bytes, hex), the device
//! identifier, the trust anchor's public key (hex, either SEC1 or the raw
//! 64-byte `x || y` form) and the pre-shared HMAC key (16 bytes, hex).

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use rust_ndn_lite_app::{BootstrapInfo, ServiceId};
use std::{fs, path::Path};

const PRIVATE_KEY_LEN: usize = 32;
const RAW_PUBLIC_KEY_LEN: usize = 64;
const SHARED_SECRET_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct SharedInfo {
    pub device_id: String,
    pub private_key: Bytes,
    pub anchor_public_key: Bytes,
    pub shared_secret: Bytes,
}

impl SharedInfo {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Malformed shared info in {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        if lines.len() < 4 {
            bail!("expected 4 lines, found {}", lines.len());
        }

        let private_key = decode_hex(lines[0], "private key")?;
        if private_key.len() != PRIVATE_KEY_LEN {
            bail!("private key must be {} bytes", PRIVATE_KEY_LEN);
        }
        let device_id = lines[1].to_string();
        if device_id.is_empty() {
            bail!("empty device identifier");
        }
        let mut anchor_public_key = decode_hex(lines[2], "anchor public key")?;
        if anchor_public_key.len() == RAW_PUBLIC_KEY_LEN {
            anchor_public_key.insert(0, 0x04);
        }
        let shared_secret = decode_hex(lines[3], "shared secret")?;
        if shared_secret.len() != SHARED_SECRET_LEN {
            bail!("shared secret must be {} bytes", SHARED_SECRET_LEN);
        }

        Ok(Self {
            device_id,
            private_key: private_key.into(),
            anchor_public_key: anchor_public_key.into(),
            shared_secret: shared_secret.into(),
        })
    }

    pub fn into_bootstrap_info(self, capabilities: Vec<ServiceId>) -> BootstrapInfo {
        BootstrapInfo {
            device_id: self.device_id,
            preinstalled_key: self.private_key,
            anchor_public_key: self.anchor_public_key,
            shared_secret: self.shared_secret,
            capabilities,
        }
    }
}

fn decode_hex(line: &str, what: &str) -> Result<Vec<u8>> {
    hex::decode(line).with_context(|| format!("{} is not valid hex", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_parse() {
        let raw = "ab".repeat(64);
        let text = format!("{}\nlight-398\n{}\n{}\n", KEY, raw, "00".repeat(16));
        let info = SharedInfo::parse(&text).unwrap();
        assert_eq!(info.device_id, "light-398");
        assert_eq!(info.private_key.len(), 32);
        assert_eq!(info.anchor_public_key.len(), 65);
        assert_eq!(info.anchor_public_key[0], 0x04);
        assert_eq!(info.shared_secret.len(), 16);
    }

    #[test]
    fn test_rejects_short_input() {
        assert!(SharedInfo::parse(&format!("{}\nlight\n", KEY)).is_err());
        let text = format!("{}\nlight\n{}\nzz\n", KEY, "ab".repeat(64));
        assert!(SharedInfo::parse(&text).is_err());
    }
}
