//! Encrypted content envelope.
//!
//! When a decryptor applies to a node, the content of its Data packet is an
//! [`EncryptedContent`] envelope: the ciphertext, the initial vector used to
//! produce it, and the name of the content key.

use crate::error::EncodingError;
use crate::name::Name;
use crate::packet::{decode, encode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Leading byte of an encoded envelope
pub const ENCRYPTED_CONTENT_TAG: u8 = 0x82;

/// Ciphertext plus the parameters needed to decrypt it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContent {
    /// Ciphertext including the authentication tag
    pub payload: Bytes,
    /// Nonce or initial vector
    pub initial_vector: Bytes,
    /// Name of the content key
    pub key_locator: Option<Name>,
}

impl EncryptedContent {
    /// Encode the envelope
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the envelope is too large to encode.
    pub fn wire_encode(&self) -> Result<Bytes, EncodingError> {
        let body = encode(self)?;
        let mut wire = Vec::with_capacity(body.len() + 1);
        wire.push(ENCRYPTED_CONTENT_TAG);
        wire.extend_from_slice(&body);
        Ok(Bytes::from(wire))
    }

    /// Decode an envelope
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::InvalidField`] if the leading tag is missing,
    /// or a decode error if the body is malformed.
    pub fn wire_decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        match bytes.split_first() {
            Some((&ENCRYPTED_CONTENT_TAG, body)) => decode(body),
            _ => Err(EncodingError::InvalidField("encrypted content tag")),
        }
    }
}
