//! Hierarchical names.
//!
//! A [`Name`] is an ordered sequence of opaque [`NameComponent`]s. Names are
//! written as URIs such as `/app/video/seg=3`, where each component is
//! percent-encoded. Components are ordered canonically: by type, then by
//! length, then by value bytes, so that shorter components sort first.

use crate::error::NameError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Prefix used when writing an implicit digest component as a URI
const DIGEST_URI_PREFIX: &str = "digest=";

/// Size of an implicit digest value (BLAKE3 output)
pub const IMPLICIT_DIGEST_SIZE: usize = 32;

/// Component type numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    /// Digest of the whole Data packet, appended to form its full name
    ImplicitDigest,
    /// Opaque application bytes
    Generic,
}

impl ComponentType {
    /// Wire type number
    #[must_use]
    pub fn number(self) -> u16 {
        match self {
            ComponentType::ImplicitDigest => 1,
            ComponentType::Generic => 8,
        }
    }
}

/// One component of a [`Name`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent {
    kind: ComponentType,
    value: Bytes,
}

impl NameComponent {
    /// Create a generic component from raw bytes
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            kind: ComponentType::Generic,
            value: value.into(),
        }
    }

    /// Create an implicit digest component
    #[must_use]
    pub fn implicit_digest(digest: [u8; IMPLICIT_DIGEST_SIZE]) -> Self {
        Self {
            kind: ComponentType::ImplicitDigest,
            value: Bytes::copy_from_slice(&digest),
        }
    }

    /// Component type
    #[must_use]
    pub fn kind(&self) -> ComponentType {
        self.kind
    }

    /// Raw value bytes
    #[must_use]
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Check if this is an implicit digest component
    #[must_use]
    pub fn is_implicit_digest(&self) -> bool {
        self.kind == ComponentType::ImplicitDigest
    }

    /// Parse one percent-encoded URI component
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the escape sequences are malformed, the
    /// component is `.` or `..`, or a digest component is not 64 hex digits.
    pub fn from_escaped(text: &str) -> Result<Self, NameError> {
        if let Some(hex_value) = text.strip_prefix(DIGEST_URI_PREFIX) {
            let mut digest = [0u8; IMPLICIT_DIGEST_SIZE];
            hex::decode_to_slice(hex_value, &mut digest)
                .map_err(|e| NameError::InvalidDigest(e.to_string()))?;
            return Ok(Self::implicit_digest(digest));
        }

        let value = unescape(text)?;
        if !value.is_empty() && value.iter().all(|&b| b == b'.') {
            // "..." encodes the empty component, "...." encodes "." and so on.
            if value.len() < 3 {
                return Err(NameError::IllegalComponent(text.to_string()));
            }
            return Ok(Self::new(value[3..].to_vec()));
        }
        Ok(Self::new(value))
    }
}

impl From<&str> for NameComponent {
    fn from(value: &str) -> Self {
        Self::new(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Vec<u8>> for NameComponent {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .number()
            .cmp(&other.kind.number())
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit_digest() {
            return write!(f, "{DIGEST_URI_PREFIX}{}", hex::encode(&self.value));
        }
        if self.value.iter().all(|&b| b == b'.') {
            f.write_str("...")?;
        }
        for &byte in self.value.iter() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "%{byte:02X}")?;
            }
        }
        Ok(())
    }
}

fn unescape(text: &str) -> Result<Vec<u8>, NameError> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex_pair = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| NameError::InvalidEscape(text.to_string()))?;
            let mut decoded = [0u8; 1];
            hex::decode_to_slice(hex_pair, &mut decoded)
                .map_err(|_| NameError::InvalidEscape(text.to_string()))?;
            out.push(decoded[0]);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// A hierarchical name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Create an empty name (`/`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a name from components
    pub fn from_components(components: impl IntoIterator<Item = NameComponent>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    /// Parse a URI such as `/a/b%20c`
    ///
    /// An optional `ndn:` scheme is accepted. Empty path segments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if any component is malformed.
    pub fn from_uri(uri: &str) -> Result<Self, NameError> {
        let path = uri.trim().strip_prefix("ndn:").unwrap_or(uri.trim());
        let path = path.split(['?', '#']).next().unwrap_or_default();
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(NameComponent::from_escaped)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_components)
    }

    /// Number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if this is the empty name
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get a component by index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Last component, if any
    #[must_use]
    pub fn last(&self) -> Option<&NameComponent> {
        self.components.last()
    }

    /// All components
    #[must_use]
    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    /// Iterate over the components
    pub fn iter(&self) -> std::slice::Iter<'_, NameComponent> {
        self.components.iter()
    }

    /// Append a component in place
    pub fn push(&mut self, component: impl Into<NameComponent>) {
        self.components.push(component.into());
    }

    /// Return a copy of this name with a component appended
    #[must_use]
    pub fn append(mut self, component: impl Into<NameComponent>) -> Self {
        self.push(component);
        self
    }

    /// The first `len` components (the whole name if `len` is larger)
    #[must_use]
    pub fn prefix(&self, len: usize) -> Name {
        Self {
            components: self.components[..len.min(self.len())].to_vec(),
        }
    }

    /// Check if this name is a prefix of `other` (every name is a prefix of itself)
    #[must_use]
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// Number of leading components shared with `other`
    #[must_use]
    pub fn common_prefix_len(&self, other: &Name) -> usize {
        self.components
            .iter()
            .zip(other.components.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// This name without a trailing implicit digest component
    #[must_use]
    pub fn without_implicit_digest(&self) -> Name {
        match self.last() {
            Some(last) if last.is_implicit_digest() => self.prefix(self.len() - 1),
            _ => self.clone(),
        }
    }

    /// Format as a URI
    #[must_use]
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic by component; a proper prefix sorts first.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a NameComponent;
    type IntoIter = std::slice::Iter<'a, NameComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}
