//! NDN packet types and structures.
//!
//! This module provides the Interest and Data packets together with their
//! canonical TLV encoding. Decoding never returns a partially built packet:
//! either the whole structure validates or an error is returned.

use crate::error::Error;
use crate::name::Name;
use crate::security::{sha256, Signer, VerificationKey, DIGEST_LENGTH};
use crate::tlv::{self, TlvElement, TlvReader};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;


/// Maximum size of an NDN packet.
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/// Interest lifetime used when none is given.
pub const DEFAULT_INTEREST_LIFETIME_MS: u64 = 4000;

/// Hop limit put on Interests created with [`Interest::new`].
pub const DEFAULT_HOP_LIMIT: u8 = 32;

fn malformed(err: Error) -> Error {
    match err {
        Error::Tlv(msg) => Error::MalformedPacket(msg),
        other => other,
    }
}

/// Kind of payload carried by a Data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Blob,
    Link,
    Key,
    Nack,
    Other(u64),
}

impl ContentType {
    pub fn code(self) -> u64 {
        match self {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(code) => code,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            other => ContentType::Other(other),
        }
    }
}

/// Signature algorithms understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    DigestSha256,
    EcdsaSha256,
    HmacSha256,
}

impl SignatureType {
    pub fn code(self) -> u64 {
        match self {
            SignatureType::DigestSha256 => 0,
            SignatureType::EcdsaSha256 => 3,
            SignatureType::HmacSha256 => 4,
        }
    }

    pub fn from_code(code: u64) -> Result<Self, Error> {
        match code {
            0 => Ok(SignatureType::DigestSha256),
            3 => Ok(SignatureType::EcdsaSha256),
            4 => Ok(SignatureType::HmacSha256),
            other => Err(Error::MalformedPacket(format!("Unsupported signature type {}", other))),
        }
    }
}

/* ---------------------------------------------------------------- *
 * Signature
 * ---------------------------------------------------------------- */

/// SignatureInfo: algorithm plus optional key locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Option<Name>,
}

impl SignatureInfo {
    pub fn digest() -> Self {
        Self {
            signature_type: SignatureType::DigestSha256,
            key_locator: None,
        }
    }

    fn encode(&self, tlv_type: u8, buf: &mut BytesMut) {
        let mut inner = BytesMut::new();
        tlv::encode_nonneg_tlv(&mut inner, tlv::TLV_SIGNATURE_TYPE, self.signature_type.code());
        if let Some(locator) = &self.key_locator {
            let name = locator.to_tlv().to_bytes();
            tlv::encode_tlv(&mut inner, tlv::TLV_KEY_LOCATOR, &name);
        }
        tlv::encode_tlv(buf, tlv_type, &inner);
    }

    fn decode(element: &TlvElement) -> Result<Self, Error> {
        let mut reader = element.reader();
        let signature_type = SignatureType::from_code(reader.expect(tlv::TLV_SIGNATURE_TYPE)?.as_nonneg()?)?;
        let key_locator = match reader.read_optional(tlv::TLV_KEY_LOCATOR)? {
            Some(locator) => {
                let mut inner = locator.reader();
                let name = Name::from_tlv(&inner.expect(tlv::TLV_NAME)?)?;
                inner.finish()?;
                Some(name)
            }
            None => None,
        };
        reader.finish()?;
        Ok(Self {
            signature_type,
            key_locator,
        })
    }
}

/// SignatureInfo together with the signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub info: SignatureInfo,
    pub value: Bytes,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            info: SignatureInfo::digest(),
            value: Bytes::new(),
        }
    }
}

/* ---------------------------------------------------------------- *
 * Interest
 * ---------------------------------------------------------------- */

/// Represents an NDN Interest packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// The name requested in the Interest.
    pub name: Name,

    /// A nonce value to detect loops and duplicates.
    pub nonce: u32,

    /// Interest lifetime in milliseconds.
    pub lifetime_ms: u64,

    /// Hop limit (similar to IP TTL).
    pub hop_limit: Option<u8>,

    /// Whether Data under a longer name may satisfy this Interest.
    pub can_be_prefix: bool,

    /// Whether cached Data must still be fresh.
    pub must_be_fresh: bool,

    /// Application-defined parameters.
    pub parameters: Option<Bytes>,

    /// Present on signed Interests.
    pub signature: Option<Signature>,
}

impl Interest {
    /// Creates a new Interest with a random nonce and default lifetime.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            nonce: rand::random(),
            lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            hop_limit: Some(DEFAULT_HOP_LIMIT),
            can_be_prefix: false,
            must_be_fresh: false,
            parameters: None,
            signature: None,
        }
    }

    /// Sets the Interest lifetime.
    pub fn with_lifetime(mut self, lifetime_ms: u64) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }

    /// Sets the nonce value.
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the can_be_prefix flag.
    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    /// Sets the must_be_fresh flag.
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    /// Sets or clears the hop limit.
    pub fn with_hop_limit(mut self, hop_limit: Option<u8>) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    /// Attaches application parameters.
    pub fn with_parameters(mut self, parameters: impl Into<Bytes>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Interest lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    /// Draw a fresh nonce, used when retransmitting.
    pub fn refresh_nonce(&mut self) {
        self.nonce = rand::random();
    }

    /// Region covered by the Interest signature: Name, parameters and
    /// InterestSignatureInfo.
    pub fn signed_portion(&self, info: &SignatureInfo) -> Bytes {
        let mut buf = BytesMut::new();
        self.name.encode(&mut buf);
        if let Some(params) = &self.parameters {
            tlv::encode_tlv(&mut buf, tlv::TLV_APPLICATION_PARAMETERS, params);
        }
        info.encode(tlv::TLV_INTEREST_SIGNATURE_INFO, &mut buf);
        buf.freeze()
    }

    /// Sign the Interest in place.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<(), Error> {
        let info = SignatureInfo {
            signature_type: signer.signature_type(),
            key_locator: signer.key_locator(),
        };
        let value = signer.sign(&self.signed_portion(&info))?;
        self.signature = Some(Signature { info, value });
        Ok(())
    }

    /// Check the Interest signature with `key`. Unsigned Interests fail.
    pub fn verify(&self, key: &VerificationKey) -> bool {
        match &self.signature {
            Some(sig) if sig.info.signature_type == key.signature_type() => {
                key.verify(&self.signed_portion(&sig.info), &sig.value)
            }
            _ => false,
        }
    }

    /// Encode to the canonical wire format.
    pub fn encode(&self) -> Bytes {
        let mut inner = BytesMut::new();
        self.name.encode(&mut inner);
        if self.can_be_prefix {
            tlv::encode_tlv(&mut inner, tlv::TLV_CAN_BE_PREFIX, &[]);
        }
        if self.must_be_fresh {
            tlv::encode_tlv(&mut inner, tlv::TLV_MUST_BE_FRESH, &[]);
        }
        tlv::encode_tlv(&mut inner, tlv::TLV_NONCE, &self.nonce.to_be_bytes());
        tlv::encode_nonneg_tlv(&mut inner, tlv::TLV_INTEREST_LIFETIME, self.lifetime_ms);
        if let Some(hop_limit) = self.hop_limit {
            tlv::encode_tlv(&mut inner, tlv::TLV_HOP_LIMIT, &[hop_limit]);
        }
        if let Some(params) = &self.parameters {
            tlv::encode_tlv(&mut inner, tlv::TLV_APPLICATION_PARAMETERS, params);
        }
        if let Some(sig) = &self.signature {
            sig.info.encode(tlv::TLV_INTEREST_SIGNATURE_INFO, &mut inner);
            tlv::encode_tlv(&mut inner, tlv::TLV_INTEREST_SIGNATURE_VALUE, &sig.value);
        }

        let mut buf = BytesMut::with_capacity(inner.len() + 4);
        tlv::encode_tlv(&mut buf, tlv::TLV_INTEREST, &inner);
        buf.freeze()
    }

    /// Decode from the wire format.
    pub fn decode(wire: &[u8]) -> Result<Self, Error> {
        Self::decode_inner(wire).map_err(malformed)
    }

    fn decode_inner(wire: &[u8]) -> Result<Self, Error> {
        if wire.len() > MAX_NDN_PACKET_SIZE {
            return Err(Error::MalformedPacket(format!("Interest of {} bytes is oversized", wire.len())));
        }
        let mut outer = TlvReader::new(Bytes::copy_from_slice(wire));
        let element = outer.expect(tlv::TLV_INTEREST)?;
        outer.finish()?;

        let mut reader = element.reader();
        let name = Name::from_tlv(&reader.expect(tlv::TLV_NAME)?)?;
        let can_be_prefix = flag(reader.read_optional(tlv::TLV_CAN_BE_PREFIX)?)?;
        let must_be_fresh = flag(reader.read_optional(tlv::TLV_MUST_BE_FRESH)?)?;

        let nonce_element = reader.expect(tlv::TLV_NONCE)?;
        if nonce_element.value.len() != 4 {
            return Err(Error::MalformedPacket("Nonce must be 4 bytes".into()));
        }
        let v = &nonce_element.value;
        let nonce = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);

        let lifetime_ms = reader.expect(tlv::TLV_INTEREST_LIFETIME)?.as_nonneg()?;

        let hop_limit = match reader.read_optional(tlv::TLV_HOP_LIMIT)? {
            Some(e) if e.value.len() == 1 => Some(e.value[0]),
            Some(_) => return Err(Error::MalformedPacket("HopLimit must be 1 byte".into())),
            None => None,
        };
        let parameters = reader
            .read_optional(tlv::TLV_APPLICATION_PARAMETERS)?
            .map(|e| e.value);

        let signature = match reader.read_optional(tlv::TLV_INTEREST_SIGNATURE_INFO)? {
            Some(info) => {
                let info = SignatureInfo::decode(&info)?;
                let value = reader.expect(tlv::TLV_INTEREST_SIGNATURE_VALUE)?.value;
                Some(Signature { info, value })
            }
            None => None,
        };
        reader.finish()?;

        Ok(Self {
            name,
            nonce,
            lifetime_ms,
            hop_limit,
            can_be_prefix,
            must_be_fresh,
            parameters,
            signature,
        })
    }
}

fn flag(element: Option<TlvElement>) -> Result<bool, Error> {
    match element {
        Some(e) if e.value.is_empty() => Ok(true),
        Some(e) => Err(Error::MalformedPacket(format!("Flag element {:#04x} must be empty", e.tlv_type))),
        None => Ok(false),
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I:{} nonce={:08x} lifetime={}ms", self.name, self.nonce, self.lifetime_ms)
    }
}

/* ---------------------------------------------------------------- *
 * Data
 * ---------------------------------------------------------------- */

/// MetaInfo: content type and freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub content_type: ContentType,
    pub freshness_period_ms: Option<u64>,
}

impl Default for MetaInfo {
    fn default() -> Self {
        Self {
            content_type: ContentType::Blob,
            freshness_period_ms: None,
        }
    }
}

impl MetaInfo {
    fn encode(&self, buf: &mut BytesMut) {
        let mut inner = BytesMut::new();
        tlv::encode_nonneg_tlv(&mut inner, tlv::TLV_CONTENT_TYPE, self.content_type.code());
        if let Some(freshness) = self.freshness_period_ms {
            tlv::encode_nonneg_tlv(&mut inner, tlv::TLV_FRESHNESS_PERIOD, freshness);
        }
        tlv::encode_tlv(buf, tlv::TLV_META_INFO, &inner);
    }

    fn decode(element: &TlvElement) -> Result<Self, Error> {
        let mut reader = element.reader();
        let content_type = ContentType::from_code(reader.expect(tlv::TLV_CONTENT_TYPE)?.as_nonneg()?);
        let freshness_period_ms = match reader.read_optional(tlv::TLV_FRESHNESS_PERIOD)? {
            Some(e) => Some(e.as_nonneg()?),
            None => None,
        };
        reader.finish()?;
        Ok(Self {
            content_type,
            freshness_period_ms,
        })
    }
}

/// Represents an NDN Data packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// The name of the Data packet.
    pub name: Name,

    /// Content type and freshness.
    pub meta: MetaInfo,

    /// The content of the Data packet.
    pub content: Bytes,

    /// Signature over name, meta info, content and signature info.
    pub signature: Signature,
}

impl Data {
    /// Creates a new, unsigned Data packet.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            meta: MetaInfo::default(),
            content: content.into(),
            signature: Signature::default(),
        }
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.meta.content_type = content_type;
        self
    }

    /// Sets the freshness period.
    pub fn with_freshness(mut self, freshness_period_ms: u64) -> Self {
        self.meta.freshness_period_ms = Some(freshness_period_ms);
        self
    }

    /// Encoded Name ‖ MetaInfo ‖ Content ‖ SignatureInfo.
    pub fn signed_portion(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_signed_portion(&self.signature.info, &mut buf);
        buf.freeze()
    }

    fn encode_signed_portion(&self, info: &SignatureInfo, buf: &mut BytesMut) {
        self.name.encode(buf);
        self.meta.encode(buf);
        tlv::encode_tlv(buf, tlv::TLV_CONTENT, &self.content);
        info.encode(tlv::TLV_SIGNATURE_INFO, buf);
    }

    /// Sign with `signer` and return the wire encoding.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<Bytes, Error> {
        self.signature.info = SignatureInfo {
            signature_type: signer.signature_type(),
            key_locator: signer.key_locator(),
        };
        self.signature.value = signer.sign(&self.signed_portion())?;
        Ok(self.encode())
    }

    /// Sign with a SHA-256 digest and return the wire encoding.
    pub fn encode_digest_sign(&mut self) -> Bytes {
        self.signature.info = SignatureInfo::digest();
        self.signature.value = Bytes::copy_from_slice(&sha256(&self.signed_portion()));
        self.encode()
    }

    /// Whether the stored DigestSha256 matches the packet.
    pub fn verify_digest(&self) -> bool {
        self.signature.info.signature_type == SignatureType::DigestSha256
            && self.signature.value.len() == DIGEST_LENGTH
            && self.signature.value[..] == sha256(&self.signed_portion())[..]
    }

    /// Whether the stored keyed signature verifies with `key`.
    pub fn verify_with(&self, key: &VerificationKey) -> bool {
        self.signature.info.signature_type == key.signature_type()
            && key.verify(&self.signed_portion(), &self.signature.value)
    }

    /// Encode to the canonical wire format.
    pub fn encode(&self) -> Bytes {
        let mut inner = BytesMut::new();
        self.encode_signed_portion(&self.signature.info, &mut inner);
        tlv::encode_tlv(&mut inner, tlv::TLV_SIGNATURE_VALUE, &self.signature.value);

        let mut buf = BytesMut::with_capacity(inner.len() + 4);
        tlv::encode_tlv(&mut buf, tlv::TLV_DATA, &inner);
        buf.freeze()
    }

    /// Decode from the wire format. Structure only: the signature is not
    /// checked here.
    pub fn decode(wire: &[u8]) -> Result<Self, Error> {
        Self::decode_inner(wire).map_err(malformed)
    }

    /// Decode and require a matching DigestSha256 before the content is
    /// handed out.
    pub fn decode_digest_verify(wire: &[u8]) -> Result<Self, Error> {
        let data = Self::decode(wire)?;
        if !data.verify_digest() {
            return Err(Error::VerificationFailure(format!("digest mismatch for {}", data.name)));
        }
        Ok(data)
    }

    fn decode_inner(wire: &[u8]) -> Result<Self, Error> {
        if wire.len() > MAX_NDN_PACKET_SIZE {
            return Err(Error::MalformedPacket(format!("Data of {} bytes is oversized", wire.len())));
        }
        let mut outer = TlvReader::new(Bytes::copy_from_slice(wire));
        let element = outer.expect(tlv::TLV_DATA)?;
        outer.finish()?;

        let mut reader = element.reader();
        let name = Name::from_tlv(&reader.expect(tlv::TLV_NAME)?)?;
        let meta = MetaInfo::decode(&reader.expect(tlv::TLV_META_INFO)?)?;
        let content = reader.expect(tlv::TLV_CONTENT)?.value;
        let info = SignatureInfo::decode(&reader.expect(tlv::TLV_SIGNATURE_INFO)?)?;
        let value = reader.expect(tlv::TLV_SIGNATURE_VALUE)?.value;
        reader.finish()?;

        Ok(Self {
            name,
            meta,
            content,
            signature: Signature { info, value },
        })
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D:{} ({} bytes)", self.name, self.content.len())
    }
}

/// Type of the outermost element, if it is an Interest or a Data.
pub fn packet_type(wire: &[u8]) -> Option<u8> {
    match wire.first() {
        Some(&t) if t == tlv::TLV_INTEREST || t == tlv::TLV_DATA => Some(t),
        _ => None,
    }
}

/// Concatenate TLV elements into a parameters/content block.
pub fn encode_elements(elements: &[TlvElement]) -> Bytes {
    let mut buf = BytesMut::new();
    for element in elements {
        element.encode(&mut buf);
    }
    buf.freeze()
}
