//! NDN names.
//!
//! A [`Name`] is an immutable, ordered sequence of opaque binary
//! components. Names order lexicographically component by component and
//! support the prefix relation used for longest-prefix matching.

use crate::error::Error;
use crate::tlv::{self, TlvElement, TlvReader};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of an NDN name component.
pub const MAX_NAME_COMPONENT_LENGTH: usize = 255;

/// Maximum number of components in an NDN name.
pub const MAX_NAME_COMPONENTS: usize = 16;

/// Represents an NDN name component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    /// Creates a new name component from a byte slice.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Creates a component holding a big-endian number, as used for
    /// timestamps and versions.
    pub fn from_number(value: u64) -> Self {
        Self(Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    /// Returns the component as bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Returns the component as UTF-8 text if it is valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Encodes this name component as a TLV element.
    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(tlv::TLV_COMPONENT, self.0.clone())
    }

    /// Decodes a name component from a TLV element.
    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_COMPONENT {
            return Err(Error::MalformedPacket(format!(
                "Expected name component TLV type {}, got {}",
                tlv::TLV_COMPONENT,
                element.tlv_type
            )));
        }
        if element.value.len() > MAX_NAME_COMPONENT_LENGTH {
            return Err(Error::MalformedPacket(format!(
                "Name component of {} bytes exceeds limit",
                element.value.len()
            )));
        }
        Ok(Self(element.value.clone()))
    }
}

impl From<&str> for NameComponent {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print printable ASCII characters directly, otherwise use hex
        let printable = !self.0.is_empty() && self.0.iter().all(|b| b.is_ascii_graphic() && *b != b'/');

        if printable {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x")?;
            for &b in self.0.iter() {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

/// Represents an NDN name, which is a sequence of name components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Creates a new empty NDN name.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Builds a name from components, enforcing the engine limits.
    pub fn from_components(components: Vec<NameComponent>) -> Result<Self, Error> {
        if components.len() > MAX_NAME_COMPONENTS {
            return Err(Error::InvalidName(format!(
                "{} components exceed the limit of {}",
                components.len(),
                MAX_NAME_COMPONENTS
            )));
        }
        if let Some(c) = components.iter().find(|c| c.0.len() > MAX_NAME_COMPONENT_LENGTH) {
            return Err(Error::InvalidName(format!("component of {} bytes is too long", c.0.len())));
        }
        Ok(Self { components })
    }

    /// Returns a new name with `component` appended.
    pub fn append(&self, component: impl Into<NameComponent>) -> Result<Self, Error> {
        let mut components = self.components.clone();
        components.push(component.into());
        Self::from_components(components)
    }

    /// Returns a new name with every component of `suffix` appended.
    pub fn join(&self, suffix: &Name) -> Result<Self, Error> {
        let mut components = self.components.clone();
        components.extend(suffix.components.iter().cloned());
        Self::from_components(components)
    }

    /// Returns the number of components in the name.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns an iterator over the name components.
    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    /// Gets a component at the specified index.
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Returns a prefix of this name with the specified length.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Returns the components from `start` onwards as a new name.
    pub fn suffix_from(&self, start: usize) -> Self {
        Self {
            components: self.components.iter().skip(start).cloned().collect(),
        }
    }

    /// Checks if this name is a prefix of another name.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Encodes this name as a TLV element.
    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();

        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }

        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    /// Encodes this name into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        self.to_tlv().encode(buf);
    }

    /// Decodes a name from a TLV element.
    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::MalformedPacket(format!(
                "Expected name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut reader = TlvReader::new(element.value.clone());

        while !reader.is_empty() {
            let element = reader.read()?;
            components.push(NameComponent::from_tlv(&element)?);
        }

        Self::from_components(components).map_err(|e| Error::MalformedPacket(e.to_string()))
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses the URI form `/a/b/c`. Empty components are skipped, so `/`
    /// is the empty name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            return Err(Error::InvalidName(format!("'{}' does not start with '/'", s)));
        }
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(NameComponent::from)
            .collect();

        Self::from_components(components)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }

        for component in &self.components {
            write!(f, "/{}", component)?;
        }

        Ok(())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_name_creation() {
        let name = name("/test/data/1");

        assert_eq!(name.len(), 3);
        assert_eq!(name.get(0).unwrap().as_bytes().as_ref(), b"test");
        assert_eq!(name.get(2).unwrap().as_str(), Some("1"));
        assert_eq!(name.to_string(), "/test/data/1");
        assert_eq!(Name::new().to_string(), "/");
    }

    #[test]
    fn test_name_compare() {
        let name1 = name("/a/b/c");
        let name2 = name("/a/b/c");
        let name3 = name("/a/b/d");
        let name4 = name("/a/b");

        assert_eq!(name1, name2);
        assert_ne!(name1, name3);
        assert!(name1 < name3);
        assert!(name4 < name1);

        assert!(name4.is_prefix_of(&name1));
        assert!(!name1.is_prefix_of(&name4));
        assert!(!name3.is_prefix_of(&name1));
        assert!(Name::new().is_prefix_of(&name1));
    }

    #[test]
    fn test_name_parse_errors() {
        assert!("no/slash".parse::<Name>().is_err());
        let long = "/x".repeat(MAX_NAME_COMPONENTS + 1);
        assert!(long.parse::<Name>().is_err());
    }

    #[test]
    fn test_binary_component_display() {
        let name = Name::new().append(NameComponent::new(vec![0x01, 0xff])).unwrap();
        assert_eq!(name.to_string(), "/0x01ff");
    }

    #[test]
    fn test_name_tlv() {
        let original = name("/room/light");
        let decoded = Name::from_tlv(&original.to_tlv()).unwrap();
        assert_eq!(decoded, original);
    }

    fn arb_name() -> impl Strategy<Value = Name> {
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 0..6).prop_map(|comps| {
            Name::from_components(comps.into_iter().map(NameComponent::new).collect()).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prefix_relation_is_reflexive(a in arb_name()) {
            prop_assert!(a.is_prefix_of(&a));
        }

        #[test]
        fn every_truncation_is_a_prefix(a in arb_name(), cut in 0usize..8) {
            let p = a.prefix(cut);
            prop_assert!(p.is_prefix_of(&a));
            prop_assert!(p <= a);
        }
    }
}
