//! Key storage used to verify incoming Data.
//!
//! Keys are indexed by the name a packet's KeyLocator carries: the
//! certificate name for ECDSA keys, the shared key name for HMAC keys.
//! Certificates are Data packets of content type KEY whose content is a
//! SEC1 public key.

use log::{debug, info};
use rust_ndn_lite_common::{
    security::{decode_public_key, VerificationKey},
    ContentType, Data, Error, Name, SignatureType,
};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct KeyStorage {
    keys: HashMap<Name, VerificationKey>,
    anchor: Option<Data>,
}

impl KeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` for packets whose KeyLocator is `name`.
    pub fn add_key(&mut self, name: Name, key: VerificationKey) {
        debug!("Key storage: trusting {}", name);
        self.keys.insert(name, key);
    }

    pub fn remove_key(&mut self, name: &Name) -> Option<VerificationKey> {
        self.keys.remove(name)
    }

    pub fn key(&self, name: &Name) -> Option<&VerificationKey> {
        self.keys.get(name)
    }

    /// Install a self-signed certificate as the trust anchor. Only the
    /// certificate's own signature is checked; pinning it is up to the
    /// caller.
    pub fn set_trust_anchor(&mut self, cert: Data) -> Result<(), Error> {
        let key = certificate_key(&cert)?;
        if cert.signature.info.key_locator.as_ref() != Some(&cert.name) || !cert.verify_with(&key) {
            return Err(Error::VerificationFailure(format!("{} is not self-signed", cert.name)));
        }
        info!("Trust anchor set to {}", cert.name);
        self.keys.insert(cert.name.clone(), key);
        self.anchor = Some(cert);
        Ok(())
    }

    pub fn trust_anchor(&self) -> Option<&Data> {
        self.anchor.as_ref()
    }

    /// Check `cert` against the keys already trusted, then trust its key.
    pub fn install_certificate(&mut self, cert: &Data) -> Result<(), Error> {
        let key = self.verify_certificate(cert)?;
        debug!("Key storage: installed certificate {}", cert.name);
        self.keys.insert(cert.name.clone(), key);
        Ok(())
    }

    /// Check `cert` against the trusted keys and return the key it binds.
    pub fn verify_certificate(&self, cert: &Data) -> Result<VerificationKey, Error> {
        let key = certificate_key(cert)?;
        self.verify_data(cert)?;
        if cert.signature.info.signature_type != SignatureType::EcdsaSha256 {
            return Err(Error::VerificationFailure(format!(
                "certificate {} is not ECDSA-signed",
                cert.name
            )));
        }
        Ok(key)
    }

    /// Verify a Data packet's signature with the stored keys. Digest
    /// signatures only need to match the packet, and must not name a key.
    pub fn verify_data(&self, data: &Data) -> Result<(), Error> {
        let info = &data.signature.info;
        if info.signature_type == SignatureType::DigestSha256 {
            if let Some(locator) = &info.key_locator {
                return Err(Error::VerificationFailure(format!(
                    "digest-signed {} claims key {}",
                    data.name, locator
                )));
            }
            return if data.verify_digest() {
                Ok(())
            } else {
                Err(Error::VerificationFailure(format!("digest mismatch for {}", data.name)))
            };
        }

        let locator = info
            .key_locator
            .as_ref()
            .ok_or_else(|| Error::VerificationFailure(format!("{} has no key locator", data.name)))?;
        let key = self
            .keys
            .get(locator)
            .ok_or_else(|| Error::VerificationFailure(format!("unknown key {} for {}", locator, data.name)))?;
        if data.verify_with(key) {
            Ok(())
        } else {
            Err(Error::VerificationFailure(format!("bad signature on {}", data.name)))
        }
    }

    /// Verify `data` signed by the key of `signer_cert`, where the
    /// certificate itself must verify against the stored keys. Nothing is
    /// installed.
    pub fn verify_with_certificate(&self, data: &Data, signer_cert: &Data) -> Result<(), Error> {
        if data.signature.info.key_locator.as_ref() != Some(&signer_cert.name) {
            return Err(Error::VerificationFailure(format!(
                "{} is not signed by {}",
                data.name, signer_cert.name
            )));
        }
        let key = self.verify_certificate(signer_cert)?;
        if data.verify_with(&key) {
            Ok(())
        } else {
            Err(Error::VerificationFailure(format!("bad signature on {}", data.name)))
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The public key carried by a certificate.
pub fn certificate_key(cert: &Data) -> Result<VerificationKey, Error> {
    if cert.meta.content_type != ContentType::Key {
        return Err(Error::VerificationFailure(format!("{} is not a certificate", cert.name)));
    }
    Ok(VerificationKey::Ecdsa(decode_public_key(&cert.content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_ndn_lite_common::security::{sha256, EcdsaSigner, HmacSigner};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn self_signed(signer: &EcdsaSigner) -> Data {
        let mut cert = Data::new(signer.key_name().clone(), signer.public_key_bytes())
            .with_content_type(ContentType::Key);
        cert.sign(signer).unwrap();
        cert
    }

    fn issue(issuer: &EcdsaSigner, subject: &EcdsaSigner) -> Data {
        let mut cert = Data::new(subject.key_name().clone(), subject.public_key_bytes())
            .with_content_type(ContentType::Key);
        cert.sign(issuer).unwrap();
        cert
    }

    #[test]
    fn test_anchor_and_chain() {
        let anchor = EcdsaSigner::generate(&name("/home")).unwrap();
        let device = EcdsaSigner::generate(&name("/home/dev")).unwrap();
        let mut keys = KeyStorage::new();
        keys.set_trust_anchor(self_signed(&anchor)).unwrap();

        let device_cert = issue(&anchor, &device);
        let mut data = Data::new(name("/home/1/DATA/dev/x"), &b"v"[..]);
        data.sign(&device).unwrap();

        assert!(keys.verify_data(&data).is_err());
        keys.verify_with_certificate(&data, &device_cert).unwrap();

        keys.install_certificate(&device_cert).unwrap();
        keys.verify_data(&data).unwrap();
    }

    #[test]
    fn test_rejects_forged_certificate() {
        let anchor = EcdsaSigner::generate(&name("/home")).unwrap();
        let rogue = EcdsaSigner::generate(&name("/home")).unwrap();
        let device = EcdsaSigner::generate(&name("/home/dev")).unwrap();
        let mut keys = KeyStorage::new();
        keys.set_trust_anchor(self_signed(&anchor)).unwrap();

        // Signed by a rogue key but pointing at the anchor.
        let mut forged = issue(&rogue, &device);
        forged.signature.info.key_locator = Some(anchor.key_name().clone());
        assert!(keys.install_certificate(&forged).is_err());
        assert!(keys.set_trust_anchor(issue(&anchor, &device)).is_err());
    }

    #[test]
    fn test_hmac_and_digest() {
        let mut keys = KeyStorage::new();
        let signer = HmacSigner::new(name("/ndn/sign-on/KEY/psk"), vec![3u8; 32]);

        let mut data = Data::new(name("/ndn/sign-on/dev"), &b"r"[..]);
        data.sign(&signer).unwrap();
        assert!(matches!(keys.verify_data(&data), Err(Error::VerificationFailure(_))));

        keys.add_key(signer.key_name().clone(), signer.verification_key());
        keys.verify_data(&data).unwrap();

        let mut digest = Data::new(name("/d"), &b"x"[..]);
        digest.encode_digest_sign();
        keys.verify_data(&digest).unwrap();
        digest.content = bytes::Bytes::from_static(b"y");
        assert!(keys.verify_data(&digest).is_err());
    }

    #[test]
    fn test_digest_naming_a_key_rejected() {
        let mut keys = KeyStorage::new();
        let signer = HmacSigner::new(name("/home/KEY/psk"), vec![5u8; 32]);
        keys.add_key(signer.key_name().clone(), signer.verification_key());

        let mut data = Data::new(name("/home/led/CMD/on/1"), &b"1"[..]);
        data.encode_digest_sign();
        data.signature.info.key_locator = Some(signer.key_name().clone());
        // The digest itself stays valid once the locator is covered.
        data.signature.value = bytes::Bytes::copy_from_slice(&sha256(&data.signed_portion()));
        assert!(data.verify_digest());
        assert!(matches!(keys.verify_data(&data), Err(Error::VerificationFailure(_))));
    }
}
