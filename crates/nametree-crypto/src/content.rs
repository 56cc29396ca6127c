//! Content encryption for Data payloads.
//!
//! A [`ContentEncryptor`] seals plaintext under a named content key and
//! returns an [`EncryptedContent`] envelope whose encoding becomes the Data
//! content. A [`ContentDecryptor`] holds the content keys a consumer has
//! obtained and opens envelopes for the namespace tree. The key name is
//! bound to the ciphertext as associated data.

use crate::CryptoError;
use crate::aead::{AeadKey, Nonce};
use bytes::Bytes;
use nametree_core::security::{OnDecryptError, OnPlaintext};
use nametree_core::{Data, Decryptor, EncryptedContent, Name};
use parking_lot::RwLock;
use rand_core::OsRng;
use std::collections::HashMap;

/// Encrypts payloads under one named content key
#[derive(Debug, Clone)]
pub struct ContentEncryptor {
    key_name: Name,
    key: AeadKey,
}

impl ContentEncryptor {
    /// Create an encryptor for the key published as `key_name`
    #[must_use]
    pub fn new(key_name: Name, key: AeadKey) -> Self {
        Self { key_name, key }
    }

    /// Name of the content key
    #[must_use]
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Seal `plaintext` with a fresh random nonce
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedContent, CryptoError> {
        let nonce = Nonce::generate(&mut OsRng);
        let aad = self.key_name.to_uri();
        let payload = self.key.encrypt(&nonce, plaintext, aad.as_bytes())?;

        Ok(EncryptedContent {
            payload: Bytes::from(payload),
            initial_vector: Bytes::copy_from_slice(nonce.as_bytes()),
            key_locator: Some(self.key_name.clone()),
        })
    }

    /// Build an unsigned Data packet named `name` carrying the encrypted `plaintext`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] if encryption or envelope encoding fails.
    pub fn encrypt_data(&self, name: Name, plaintext: &[u8]) -> Result<Data, CryptoError> {
        let envelope = self.encrypt(plaintext)?;
        Ok(Data::new(name, envelope.wire_encode()?))
    }
}

/// Opens [`EncryptedContent`] envelopes with known content keys
#[derive(Debug, Default)]
pub struct ContentDecryptor {
    keys: RwLock<HashMap<Name, AeadKey>>,
}

impl ContentDecryptor {
    /// Create a decryptor with no keys
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the content key named `key_name` available
    pub fn add_key(&self, key_name: Name, key: AeadKey) {
        self.keys.write().insert(key_name, key);
    }

    /// Forget the content key named `key_name`
    pub fn remove_key(&self, key_name: &Name) -> bool {
        self.keys.write().remove(key_name).is_some()
    }

    /// Open `content`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingKeyLocator`] or
    /// [`CryptoError::UnknownKey`] if no key applies,
    /// [`CryptoError::InvalidNonceLength`] for a malformed initial vector and
    /// [`CryptoError::DecryptionFailed`] if authentication fails.
    pub fn open(&self, content: &EncryptedContent) -> Result<Bytes, CryptoError> {
        let key_name = content
            .key_locator
            .as_ref()
            .ok_or(CryptoError::MissingKeyLocator)?;
        let key = self
            .keys
            .read()
            .get(key_name)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownKey(key_name.clone()))?;

        let nonce = Nonce::from_slice(&content.initial_vector)?;
        let aad = key_name.to_uri();
        key.decrypt(&nonce, &content.payload, aad.as_bytes())
            .map(Bytes::from)
    }
}

impl Decryptor for ContentDecryptor {
    fn decrypt(&self, content: EncryptedContent, on_plaintext: OnPlaintext, on_error: OnDecryptError) {
        match self.open(&content) {
            Ok(plaintext) => on_plaintext(plaintext),
            Err(e) => {
                tracing::debug!("Cannot open encrypted content: {}", e);
                on_error(e.into());
            }
        }
    }
}
