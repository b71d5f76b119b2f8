//! TLV (Type‑Length‑Value) encoding and decoding utilities.
//!
//! Types are single bytes (every type used by the engine is below 253).
//! Lengths use the NDN variable‑width number scheme and non‑negative
//! integers use the minimal 1/2/4/8‑byte form. Encoding is canonical and
//! decoding rejects non‑minimal forms, so a decoded packet re‑encodes to
//! exactly the bytes it came from.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/* ---------------------------------------------------------------- *
 * TLV type constants
 * ---------------------------------------------------------------- */

pub const TLV_INTEREST: u8 = 0x05;
pub const TLV_DATA: u8 = 0x06;
pub const TLV_NAME: u8 = 0x07;
pub const TLV_COMPONENT: u8 = 0x08;
pub const TLV_NONCE: u8 = 0x0A;
pub const TLV_INTEREST_LIFETIME: u8 = 0x0C;
pub const TLV_MUST_BE_FRESH: u8 = 0x12;
pub const TLV_META_INFO: u8 = 0x14;
pub const TLV_CONTENT: u8 = 0x15;
pub const TLV_SIGNATURE_INFO: u8 = 0x16;
pub const TLV_SIGNATURE_VALUE: u8 = 0x17;
pub const TLV_CONTENT_TYPE: u8 = 0x18;
pub const TLV_FRESHNESS_PERIOD: u8 = 0x19;
pub const TLV_SIGNATURE_TYPE: u8 = 0x1B;
pub const TLV_KEY_LOCATOR: u8 = 0x1C;
pub const TLV_CAN_BE_PREFIX: u8 = 0x21;
pub const TLV_HOP_LIMIT: u8 = 0x22;
pub const TLV_APPLICATION_PARAMETERS: u8 = 0x24;
pub const TLV_INTEREST_SIGNATURE_INFO: u8 = 0x2C;
pub const TLV_INTEREST_SIGNATURE_VALUE: u8 = 0x2E;

/// First type value reserved for application-defined elements.
pub const TLV_APP_BASE: u8 = 0x80;

/* ---------------------------------------------------------------- *
 * Encoding helpers
 * ---------------------------------------------------------------- */

/// Encode the 1‑byte TLV *type* field.
pub fn encode_tlv_type(tlv_type: u8, buf: &mut BytesMut) {
    debug_assert!(tlv_type < 253, "multi-byte TLV types are not used");
    buf.put_u8(tlv_type);
}

/// Encode the variable‑width TLV *length* field.
///
/// * `< 253`  → 1 byte
/// * `≤ 65 535`  → marker 253 + 2‑byte length
/// * otherwise → marker 254 + 4‑byte length (max ≈ 4 GB)
pub fn encode_tlv_length(length: usize, buf: &mut BytesMut) {
    if length < 253 {
        buf.put_u8(length as u8);
    } else if length <= 65_535 {
        buf.put_u8(253);
        buf.put_u16(length as u16);
    } else {
        buf.put_u8(254);
        buf.put_u32(length as u32);
    }
}

/// Encode a complete element from a type and a value slice.
pub fn encode_tlv(buf: &mut BytesMut, tlv_type: u8, value: &[u8]) {
    encode_tlv_type(tlv_type, buf);
    encode_tlv_length(value.len(), buf);
    buf.extend_from_slice(value);
}

/// Encode a non‑negative integer element using the shortest of the
/// 1, 2, 4 or 8 byte forms.
pub fn encode_nonneg_tlv(buf: &mut BytesMut, tlv_type: u8, value: u64) {
    encode_tlv_type(tlv_type, buf);
    if value <= u8::MAX as u64 {
        buf.put_u8(1);
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(2);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(4);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(8);
        buf.put_u64(value);
    }
}

/* ---------------------------------------------------------------- *
 * Decoding helpers
 * ---------------------------------------------------------------- */

/// Decode the TLV *type* field (single byte).
pub fn decode_tlv_type(buf: &mut impl Buf) -> Result<u8, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("Buffer underflow when decoding TLV type".into()));
    }
    let tlv_type = buf.get_u8();
    if tlv_type >= 253 {
        return Err(Error::Tlv(format!("Unsupported multi-byte TLV type marker {}", tlv_type)));
    }
    Ok(tlv_type)
}

/// Decode the TLV *length* field using NDN variable‑length rules.
///
/// Non‑minimal encodings are rejected to keep decoding canonical.
pub fn decode_tlv_length(buf: &mut impl Buf) -> Result<usize, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("Buffer underflow when decoding TLV length".into()));
    }

    let first_byte = buf.get_u8();
    match first_byte {
        0..=252 => Ok(first_byte as usize),
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Tlv("Buffer underflow when decoding 16‑bit TLV length".into()));
            }
            let length = buf.get_u16() as usize;
            if length < 253 {
                return Err(Error::Tlv("Non-minimal 16-bit TLV length".into()));
            }
            Ok(length)
        }
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Tlv("Buffer underflow when decoding 32‑bit TLV length".into()));
            }
            let length = buf.get_u32() as usize;
            if length <= 65_535 {
                return Err(Error::Tlv("Non-minimal 32-bit TLV length".into()));
            }
            Ok(length)
        }
        255 => Err(Error::Tlv("64‑bit TLV lengths not supported".into())),
    }
}

/// Decode the value of a non‑negative integer element.
pub fn decode_nonneg(value: &[u8]) -> Result<u64, Error> {
    let decoded = match value.len() {
        1 => value[0] as u64,
        2 => u16::from_be_bytes([value[0], value[1]]) as u64,
        4 => u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as u64,
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(value);
            u64::from_be_bytes(raw)
        }
        n => return Err(Error::Tlv(format!("Invalid non-negative integer width {}", n))),
    };
    if nonneg_size(decoded) != value.len() {
        return Err(Error::Tlv("Non-minimal non-negative integer".into()));
    }
    Ok(decoded)
}

/// Size of the element starting at `buf`, known as soon as its type and
/// length are present. The value may still be incomplete, so stream readers
/// can reject an oversized frame before buffering it.
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>, Error> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let header = match buf[1] {
        0..=252 => 2,
        253 => 4,
        254 => 6,
        _ => return Err(Error::Tlv("64‑bit TLV lengths not supported".into())),
    };
    if buf.len() < header {
        return Ok(None);
    }
    let mut cursor = &buf[1..header];
    Ok(Some(header + decode_tlv_length(&mut cursor)?))
}

/* ---------------------------------------------------------------- *
 * TLV element wrapper
 * ---------------------------------------------------------------- */

/// A generic TLV element consisting of *type*, *length* and *value*.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u8,
    pub value: Bytes,
}

impl TlvElement {
    /// Create a new wrapper from raw parts.
    pub fn new(tlv_type: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Total number of bytes when this element is encoded.
    pub fn len(&self) -> usize {
        let vlen = self.value.len();
        1            // type
        + tlv_length_size(vlen)
        + vlen       // value
    }

    /// Whether the value is empty (the element itself never is).
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encode this element into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_tlv_type(self.tlv_type, buf);
        encode_tlv_length(self.value.len(), buf);
        buf.extend_from_slice(&self.value);
    }

    /// Encode this element into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode a single element from `buf` **in‑place**.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 2 {
            return Err(Error::Tlv("Buffer too small for TLV header".into()));
        }

        let tlv_type = decode_tlv_type(buf)?;
        let length = decode_tlv_length(buf)?;

        if buf.remaining() < length {
            return Err(Error::Tlv(format!(
                "Buffer underflow: TLV value requires {} bytes but only {} available",
                length,
                buf.remaining()
            )));
        }

        // bytes 1.*: cheap zero‑copy slice
        let value = buf.copy_to_bytes(length);
        Ok(Self { tlv_type, value })
    }

    /// Decode the value as a non‑negative integer.
    pub fn as_nonneg(&self) -> Result<u64, Error> {
        decode_nonneg(&self.value)
    }

    /// Open a reader over the nested elements of this element's value.
    pub fn reader(&self) -> TlvReader {
        TlvReader::new(self.value.clone())
    }
}

/* ---------------------------------------------------------------- *
 * Sequential reader
 * ---------------------------------------------------------------- */

/// Reads a sequence of sibling elements in order.
#[derive(Debug, Clone)]
pub struct TlvReader {
    buf: Bytes,
}

impl TlvReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// True once every element has been consumed.
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Type of the next element without consuming it.
    pub fn peek_type(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    /// Consume the next element, whatever its type.
    pub fn read(&mut self) -> Result<TlvElement, Error> {
        TlvElement::decode(&mut self.buf)
    }

    /// Consume the next element, which must have type `tlv_type`.
    pub fn expect(&mut self, tlv_type: u8) -> Result<TlvElement, Error> {
        match self.peek_type() {
            Some(t) if t == tlv_type => self.read(),
            Some(t) => Err(Error::Tlv(format!("Expected TLV type {:#04x}, got {:#04x}", tlv_type, t))),
            None => Err(Error::Tlv(format!("Missing TLV type {:#04x}", tlv_type))),
        }
    }

    /// Consume the next element only if it has type `tlv_type`.
    pub fn read_optional(&mut self, tlv_type: u8) -> Result<Option<TlvElement>, Error> {
        if self.peek_type() == Some(tlv_type) {
            self.read().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fail if any bytes are left over.
    pub fn finish(&self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Tlv(format!(
                "Unexpected trailing element of type {:#04x}",
                self.buf[0]
            )))
        }
    }
}

/* ---------------------------------------------------------------- *
 * Helper
 * ---------------------------------------------------------------- */

/// Number of bytes required to encode `length` with the variable‑width scheme.
pub fn tlv_length_size(length: usize) -> usize {
    if length < 253 {
        1
    } else if length <= 65_535 {
        3
    } else {
        5
    }
}

fn nonneg_size(value: u64) -> usize {
    if value <= u8::MAX as u64 {
        1
    } else if value <= u16::MAX as u64 {
        2
    } else if value <= u32::MAX as u64 {
        4
    } else {
        8
    }
}
