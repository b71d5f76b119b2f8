//! Device identities and certificates.
//!
//! A certificate is a Data packet named `/<identity>/KEY/<key-id>`, of
//! content type KEY, whose content is the SEC1 public key it binds. It is
//! signed by the issuer's key; a trust anchor signs its own certificate.

use bytes::Bytes;
use rust_ndn_lite_common::{
    security::{encode_public_key, key_name, EcdsaSigner, KEY_COMPONENT},
    ContentType, Data, Error, Name, NameComponent,
};
use rust_ndn_lite_forwarder::keys::certificate_key;

/// Freshness of served certificates.
pub const CERTIFICATE_FRESHNESS_MS: u64 = 3_600_000;

/// Issue a certificate for `public_key` under `subject`, signed by `issuer`.
pub fn issue_certificate(issuer: &EcdsaSigner, subject: &Name, public_key: &[u8]) -> Result<Data, Error> {
    let mut cert = Data::new(key_name(subject, public_key)?, Bytes::copy_from_slice(public_key))
        .with_content_type(ContentType::Key)
        .with_freshness(CERTIFICATE_FRESHNESS_MS);
    cert.sign(issuer)?;
    Ok(cert)
}

/// Self-signed certificate of `signer`, used as a trust anchor.
pub fn self_signed_certificate(signer: &EcdsaSigner) -> Result<Data, Error> {
    let mut cert = Data::new(signer.key_name().clone(), signer.public_key_bytes())
        .with_content_type(ContentType::Key)
        .with_freshness(CERTIFICATE_FRESHNESS_MS);
    cert.sign(signer)?;
    Ok(cert)
}

/// The identity a certificate or key name belongs to: the name without its
/// trailing `KEY/<key-id>`.
pub fn certificate_identity(key_name: &Name) -> Result<Name, Error> {
    let len = key_name.len();
    let key = NameComponent::from(KEY_COMPONENT);
    if len < 2 || key_name.get(len - 2) != Some(&key) {
        return Err(Error::InvalidName(format!("{} is not a key name", key_name)));
    }
    Ok(key_name.prefix(len - 2))
}

/// Device identifier the anchor identity publishes under.
pub const CONTROLLER_DEVICE_ID: &str = "controller";

/// Everything a bootstrapped device knows about itself.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    device_id: String,
    home_prefix: Name,
    signer: EcdsaSigner,
    certificate: Data,
    anchor: Data,
}

impl DeviceIdentity {
    /// Bind a signer to its certificate. The certificate must carry the
    /// signer's public key and live under `/<home>/<device-id>`.
    pub fn new(device_id: impl Into<String>, signer: EcdsaSigner, certificate: Data, anchor: Data) -> Result<Self, Error> {
        let device_id = device_id.into();
        let home_prefix = certificate_identity(&anchor.name)?;
        let expected = home_prefix.append(device_id.as_str())?;
        if certificate_identity(&certificate.name)? != expected {
            return Err(Error::InvalidName(format!(
                "certificate {} does not belong to {}",
                certificate.name, expected
            )));
        }
        let bound = certificate_key(&certificate)?;
        if bound != signer.verification_key() {
            return Err(Error::Crypto(format!("certificate {} binds another key", certificate.name)));
        }
        let signer = signer.rename(&expected)?;
        Ok(Self {
            device_id,
            home_prefix,
            signer,
            certificate,
            anchor,
        })
    }

    /// The identity of the trust anchor itself, as used by a controller.
    pub fn anchor(signer: EcdsaSigner) -> Result<Self, Error> {
        let anchor = self_signed_certificate(&signer)?;
        let home_prefix = certificate_identity(&anchor.name)?;
        Ok(Self {
            device_id: CONTROLLER_DEVICE_ID.to_string(),
            home_prefix,
            signer,
            certificate: anchor.clone(),
            anchor,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn home_prefix(&self) -> &Name {
        &self.home_prefix
    }

    /// `/<home>/<device-id>`, or the home prefix for the anchor identity.
    pub fn identity_name(&self) -> Result<Name, Error> {
        certificate_identity(&self.certificate.name)
    }

    pub fn signer(&self) -> &EcdsaSigner {
        &self.signer
    }

    pub fn certificate(&self) -> &Data {
        &self.certificate
    }

    pub fn anchor_certificate(&self) -> &Data {
        &self.anchor
    }

    pub fn public_key(&self) -> Bytes {
        encode_public_key(&self.signer.verifying_key())
    }

    pub fn is_anchor(&self) -> bool {
        self.certificate.name == self.anchor.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_issue_and_identity() {
        let anchor = EcdsaSigner::generate(&name("/home")).unwrap();
        let device = EcdsaSigner::generate(&name("/tmp")).unwrap();
        let anchor_cert = self_signed_certificate(&anchor).unwrap();
        let cert = issue_certificate(&anchor, &name("/home/dev1"), &device.public_key_bytes()).unwrap();

        assert_eq!(cert.signature.info.key_locator.as_ref(), Some(&anchor_cert.name));
        assert_eq!(certificate_identity(&cert.name).unwrap(), name("/home/dev1"));

        let identity = DeviceIdentity::new("dev1", device, cert.clone(), anchor_cert).unwrap();
        assert_eq!(identity.home_prefix(), &name("/home"));
        assert_eq!(identity.identity_name().unwrap(), name("/home/dev1"));
        assert_eq!(identity.signer().key_name(), &cert.name);
        assert!(!identity.is_anchor());
    }

    #[test]
    fn test_identity_rejects_foreign_certificate() {
        let anchor = EcdsaSigner::generate(&name("/home")).unwrap();
        let device = EcdsaSigner::generate(&name("/home/dev1")).unwrap();
        let other = EcdsaSigner::generate(&name("/home/dev1")).unwrap();
        let anchor_cert = self_signed_certificate(&anchor).unwrap();

        let wrong_key = issue_certificate(&anchor, &name("/home/dev1"), &other.public_key_bytes()).unwrap();
        assert!(DeviceIdentity::new("dev1", device.clone(), wrong_key, anchor_cert.clone()).is_err());

        let wrong_name = issue_certificate(&anchor, &name("/home/dev2"), &device.public_key_bytes()).unwrap();
        assert!(DeviceIdentity::new("dev1", device, wrong_name, anchor_cert).is_err());
    }

    #[test]
    fn test_anchor_identity() {
        let identity = DeviceIdentity::anchor(EcdsaSigner::generate(&name("/home")).unwrap()).unwrap();
        assert!(identity.is_anchor());
        assert_eq!(identity.identity_name().unwrap(), name("/home"));
        assert!(certificate_identity(&name("/home/dev1")).is_err());
    }
}
