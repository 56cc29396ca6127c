//! Interest and Data packets.
//!
//! Framing is left to the transport; the encodings here exist so that signers
//! have a stable byte string to sign, and so that a Data packet has an
//! implicit digest for its full name.

use crate::error::EncodingError;
use crate::name::{IMPLICIT_DIGEST_SIZE, Name, NameComponent};
use bincode::Options;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest encoding accepted by [`Data::wire_decode`]
pub const MAX_PACKET_SIZE: u64 = 8800;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_PACKET_SIZE)
        .reject_trailing_bytes()
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodingError> {
    Ok(codec().serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EncodingError> {
    Ok(codec().deserialize(bytes)?)
}

/// A request for content by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    name: Name,
    must_be_fresh: bool,
    lifetime: Option<Duration>,
}

impl Interest {
    /// Create an Interest with no lifetime and `must_be_fresh` unset
    #[must_use]
    pub fn new(name: Name) -> Self {
        Self {
            name,
            must_be_fresh: false,
            lifetime: None,
        }
    }

    /// Set the MustBeFresh flag
    #[must_use]
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    /// Set the Interest lifetime
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Requested name
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// MustBeFresh flag
    #[must_use]
    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }

    /// Interest lifetime, if any
    #[must_use]
    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    /// Replace the lifetime (used when re-expressing)
    pub fn set_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = Some(lifetime);
    }

    /// Check if this Interest's name is a prefix of `name`
    #[must_use]
    pub fn matches_name(&self, name: &Name) -> bool {
        self.name.is_prefix_of(name)
    }

    /// Check if `data` satisfies this Interest by name
    ///
    /// An Interest ending in an implicit digest is compared against the full
    /// name of the Data packet.
    #[must_use]
    pub fn matches_data(&self, data: &Data) -> bool {
        match self.name.last() {
            Some(last) if last.is_implicit_digest() => data
                .full_name()
                .map(|full| self.name.is_prefix_of(&full))
                .unwrap_or(false),
            _ => self.matches_name(data.name()),
        }
    }
}

/// Content type carried in [`MetaInfo`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Application payload
    #[default]
    Blob,
    /// Public key
    Key,
    /// Application-level negative acknowledgement
    Nack,
}

/// Data packet metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    /// Type of the content
    pub content_type: ContentType,
    /// How long the Data stays fresh after it is received; `None` never goes stale
    pub freshness_period: Option<Duration>,
    /// Final block ID for segmented content
    pub final_block_id: Option<NameComponent>,
}

impl MetaInfo {
    /// MetaInfo with only a freshness period
    #[must_use]
    pub fn with_freshness_period(freshness_period: Duration) -> Self {
        Self {
            freshness_period: Some(freshness_period),
            ..Default::default()
        }
    }
}

/// Signature attached to a Data packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Name of the key that produced the signature
    pub key_locator: Option<Name>,
    /// Signature bytes
    pub value: Bytes,
}

/// A named, optionally signed content packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    name: Name,
    meta_info: MetaInfo,
    content: Bytes,
    signature: Option<SignatureInfo>,
}

#[derive(Serialize)]
struct SignedPortion<'a> {
    name: &'a Name,
    meta_info: &'a MetaInfo,
    content: &'a Bytes,
    key_locator: Option<&'a Name>,
}

impl Data {
    /// Create an unsigned Data packet
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            meta_info: MetaInfo::default(),
            content: content.into(),
            signature: None,
        }
    }

    /// Set the MetaInfo
    #[must_use]
    pub fn with_meta_info(mut self, meta_info: MetaInfo) -> Self {
        self.meta_info = meta_info;
        self
    }

    /// Data name
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// MetaInfo
    #[must_use]
    pub fn meta_info(&self) -> &MetaInfo {
        &self.meta_info
    }

    /// Replace the MetaInfo
    pub fn set_meta_info(&mut self, meta_info: MetaInfo) {
        self.meta_info = meta_info;
    }

    /// Content bytes
    #[must_use]
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Signature, if signed
    #[must_use]
    pub fn signature(&self) -> Option<&SignatureInfo> {
        self.signature.as_ref()
    }

    /// Attach a signature
    pub fn set_signature(&mut self, signature: SignatureInfo) {
        self.signature = Some(signature);
    }

    /// Bytes covered by the signature: name, MetaInfo, content and key locator
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the packet cannot be encoded.
    pub fn signed_portion(&self, key_locator: Option<&Name>) -> Result<Vec<u8>, EncodingError> {
        encode(&SignedPortion {
            name: &self.name,
            meta_info: &self.meta_info,
            content: &self.content,
            key_locator,
        })
    }

    /// Encode the whole packet
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the packet exceeds [`MAX_PACKET_SIZE`].
    pub fn wire_encode(&self) -> Result<Bytes, EncodingError> {
        encode(self).map(Bytes::from)
    }

    /// Decode a packet produced by [`Data::wire_encode`]
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] on malformed or oversized input.
    pub fn wire_decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        decode(bytes)
    }

    /// BLAKE3 digest of the wire encoding
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the packet cannot be encoded.
    pub fn implicit_digest(&self) -> Result<[u8; IMPLICIT_DIGEST_SIZE], EncodingError> {
        let wire = self.wire_encode()?;
        Ok(*blake3::hash(&wire).as_bytes())
    }

    /// Name with the implicit digest appended
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the packet cannot be encoded.
    pub fn full_name(&self) -> Result<Name, EncodingError> {
        let digest = self.implicit_digest()?;
        Ok(self
            .name
            .clone()
            .append(NameComponent::implicit_digest(digest)))
    }
}

/// Reason carried by a network-level negative acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NackReason {
    /// Upstream is congested
    Congestion,
    /// Duplicate nonce detected
    Duplicate,
    /// No route to the name
    NoRoute,
    /// Reason not given
    Unspecified,
}

/// Network-level rejection of an Interest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkNack {
    /// Why the Interest was rejected
    pub reason: NackReason,
}

impl NetworkNack {
    /// Create a nack with a reason
    #[must_use]
    pub fn new(reason: NackReason) -> Self {
        Self { reason }
    }
}
