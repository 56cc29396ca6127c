//! Ed25519 Data signing and validation.
//!
//! The signer covers the Data's signed portion, which includes the key
//! locator, so a signature cannot be moved to a different key name.

use crate::CryptoError;
use crate::signatures::{Signature, SigningKey, VerifyingKey};
use bytes::Bytes;
use nametree_core::{Data, Name, SignError, SignatureInfo, Signer, ValidationError, Validator};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Signs produced Data with an Ed25519 key published under a name
#[derive(Debug)]
pub struct Ed25519Signer {
    key_name: Name,
    key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer whose signatures carry `key_name` as key locator
    #[must_use]
    pub fn new(key_name: Name, key: SigningKey) -> Self {
        Self { key_name, key }
    }

    /// Name placed in the key locator
    #[must_use]
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Verifying key for this signer
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, data: &mut Data) -> Result<(), SignError> {
        let portion = data
            .signed_portion(Some(&self.key_name))
            .map_err(|e| SignError(e.to_string().into()))?;
        let signature = self.key.sign(&portion);
        data.set_signature(SignatureInfo {
            key_locator: Some(self.key_name.clone()),
            value: Bytes::copy_from_slice(signature.as_bytes()),
        });
        Ok(())
    }
}

/// Validates Ed25519 Data signatures against trusted named keys
#[derive(Debug, Default)]
pub struct Ed25519Validator {
    trusted: RwLock<HashMap<Name, VerifyingKey>>,
}

impl Ed25519Validator {
    /// Create a validator with no trusted keys
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` for signatures whose key locator is `key_name`
    ///
    /// Replaces any key previously trusted under the same name.
    pub fn trust(&self, key_name: Name, key: VerifyingKey) {
        self.trusted.write().insert(key_name, key);
    }

    /// Stop trusting the key named `key_name`
    pub fn revoke(&self, key_name: &Name) -> bool {
        self.trusted.write().remove(key_name).is_some()
    }

    /// Check the signature of `data`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingKeyLocator`] or
    /// [`CryptoError::UnknownKey`] if the signing key cannot be found, and
    /// [`CryptoError::InvalidSignature`] if the signature does not verify.
    pub fn check(&self, data: &Data) -> Result<(), CryptoError> {
        let info = data.signature().ok_or(CryptoError::InvalidSignature)?;
        let key_name = info
            .key_locator
            .as_ref()
            .ok_or(CryptoError::MissingKeyLocator)?;
        let key = self
            .trusted
            .read()
            .get(key_name)
            .copied()
            .ok_or_else(|| CryptoError::UnknownKey(key_name.clone()))?;

        let signature = Signature::from_slice(&info.value)?;
        let portion = data.signed_portion(Some(key_name))?;
        key.verify(&portion, &signature)
    }
}

impl Validator for Ed25519Validator {
    fn validate(&self, data: &Data) -> Result<(), ValidationError> {
        self.check(data).map_err(|e| {
            tracing::debug!("Signature check failed for {}: {}", data.name(), e);
            ValidationError(e.to_string().into())
        })
    }
}
