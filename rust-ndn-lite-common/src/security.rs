//! Packet signing and verification.
//!
//! The cryptographic primitives are used as black boxes: SHA-256 from
//! `sha2`, HMAC-SHA256 from `hmac` and ECDSA over secp256k1 from `k256`.
//! Everything the forwarder and application layers need goes through the
//! [`Signer`] trait and [`VerificationKey`].

use crate::error::Error;
use crate::name::{Name, NameComponent};
use crate::ndn::SignatureType;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Name component marking the key part of an identity's key name.
pub const KEY_COMPONENT: &str = "KEY";

/// Length of a DigestSha256 signature value.
pub const DIGEST_LENGTH: usize = 32;

/// SHA-256 over `region`.
pub fn sha256(region: &[u8]) -> [u8; 32] {
    Sha256::digest(region).into()
}

/// Key identifier: the first 8 bytes of the SHA-256 of the encoded key.
pub fn key_id(public_key: &[u8]) -> NameComponent {
    NameComponent::new(Bytes::copy_from_slice(&sha256(public_key)[..8]))
}

/// `/<identity>/KEY/<key-id>` for the given public key bytes.
pub fn key_name(identity: &Name, public_key: &[u8]) -> Result<Name, Error> {
    identity.append(KEY_COMPONENT)?.append(key_id(public_key))
}

/// Produces signature values for a signed region.
pub trait Signer {
    /// The signature type written into SignatureInfo.
    fn signature_type(&self) -> SignatureType;

    /// The key locator written into SignatureInfo, if any.
    fn key_locator(&self) -> Option<Name>;

    /// Sign the encoded region.
    fn sign(&self, region: &[u8]) -> Result<Bytes, Error>;
}

/// Unkeyed integrity protection: the signature is a SHA-256 digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigner;

impl Signer for DigestSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::DigestSha256
    }

    fn key_locator(&self) -> Option<Name> {
        None
    }

    fn sign(&self, region: &[u8]) -> Result<Bytes, Error> {
        Ok(Bytes::copy_from_slice(&sha256(region)))
    }
}

/// HMAC-SHA256 with a shared secret.
#[derive(Clone)]
pub struct HmacSigner {
    key_name: Name,
    secret: Bytes,
}

impl HmacSigner {
    pub fn new(key_name: Name, secret: impl Into<Bytes>) -> Self {
        Self {
            key_name,
            secret: secret.into(),
        }
    }

    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// The matching verification key.
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey::Hmac(self.secret.clone())
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").field("key_name", &self.key_name).finish_non_exhaustive()
    }
}

impl Signer for HmacSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::HmacSha256
    }

    fn key_locator(&self) -> Option<Name> {
        Some(self.key_name.clone())
    }

    fn sign(&self, region: &[u8]) -> Result<Bytes, Error> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Crypto(format!("invalid HMAC key: {}", e)))?;
        mac.update(region);
        Ok(Bytes::copy_from_slice(&mac.finalize().into_bytes()))
    }
}

/// ECDSA-SHA256 with a private key that never leaves this struct.
#[derive(Clone)]
pub struct EcdsaSigner {
    key_name: Name,
    key: SigningKey,
}

impl EcdsaSigner {
    /// Wrap an existing private key; the key name is derived from the
    /// identity and the public key.
    pub fn new(identity: &Name, key: SigningKey) -> Result<Self, Error> {
        let public = encode_public_key(key.verifying_key());
        Ok(Self {
            key_name: key_name(identity, &public)?,
            key,
        })
    }

    /// Generate a fresh key pair for `identity`.
    pub fn generate(identity: &Name) -> Result<Self, Error> {
        Self::new(identity, SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Load a raw 32-byte private scalar.
    pub fn from_private_bytes(identity: &Name, bytes: &[u8]) -> Result<Self, Error> {
        let key = SigningKey::from_slice(bytes).map_err(|e| Error::Crypto(format!("invalid private key: {}", e)))?;
        Self::new(identity, key)
    }

    /// Same key, re-homed under another identity.
    pub fn rename(&self, identity: &Name) -> Result<Self, Error> {
        Self::new(identity, self.key.clone())
    }

    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key().clone()
    }

    /// SEC1 compressed public key.
    pub fn public_key_bytes(&self) -> Bytes {
        encode_public_key(self.key.verifying_key())
    }

    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey::Ecdsa(self.verifying_key())
    }
}

impl std::fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaSigner").field("key_name", &self.key_name).finish_non_exhaustive()
    }
}

impl Signer for EcdsaSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::EcdsaSha256
    }

    fn key_locator(&self) -> Option<Name> {
        Some(self.key_name.clone())
    }

    fn sign(&self, region: &[u8]) -> Result<Bytes, Error> {
        let signature: EcdsaSignature = self.key.sign(region);
        Ok(Bytes::copy_from_slice(&signature.to_bytes()))
    }
}

/// SEC1 compressed encoding of a public key.
pub fn encode_public_key(key: &VerifyingKey) -> Bytes {
    Bytes::from(key.to_sec1_bytes().into_vec())
}

/// Parse a SEC1 public key (compressed or uncompressed).
pub fn decode_public_key(bytes: &[u8]) -> Result<VerifyingKey, Error> {
    VerifyingKey::from_sec1_bytes(bytes).map_err(|e| Error::Crypto(format!("invalid public key: {}", e)))
}

/// Key material able to check a keyed signature.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationKey {
    Ecdsa(VerifyingKey),
    Hmac(Bytes),
}

impl VerificationKey {
    /// The signature type this key can verify.
    pub fn signature_type(&self) -> SignatureType {
        match self {
            VerificationKey::Ecdsa(_) => SignatureType::EcdsaSha256,
            VerificationKey::Hmac(_) => SignatureType::HmacSha256,
        }
    }

    /// Check `signature` over `region`.
    pub fn verify(&self, region: &[u8], signature: &[u8]) -> bool {
        match self {
            VerificationKey::Ecdsa(key) => match EcdsaSignature::from_slice(signature) {
                Ok(sig) => key.verify(region, &sig).is_ok(),
                Err(_) => false,
            },
            VerificationKey::Hmac(secret) => match HmacSha256::new_from_slice(secret) {
                Ok(mut mac) => {
                    mac.update(region);
                    mac.verify_slice(signature).is_ok()
                }
                Err(_) => false,
            },
        }
    }
}
