//! Signing, decryption and validation collaborators.
//!
//! Concrete Ed25519 and XChaCha20-Poly1305 implementations live in the
//! `nametree-crypto` crate. This module only defines the interfaces, plus a
//! keyless BLAKE3 digest signer useful for integrity-only content.

use crate::encrypted::EncryptedContent;
use crate::error::{DecryptError, SignError, ValidationError};
use crate::packet::{Data, SignatureInfo};
use bytes::Bytes;

/// Receives the plaintext of a successful decryption
pub type OnPlaintext = Box<dyn FnOnce(Bytes) + Send>;

/// Receives a decryption failure
pub type OnDecryptError = Box<dyn FnOnce(DecryptError) + Send>;

/// Signs Data packets produced by the tree
pub trait Signer: Send + Sync {
    /// Sign `data` in place, setting its signature
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] if the packet cannot be signed.
    fn sign(&self, data: &mut Data) -> Result<(), SignError>;
}

/// Decrypts [`EncryptedContent`] envelopes
pub trait Decryptor: Send + Sync {
    /// Decrypt `content`
    ///
    /// May complete on another thread. At most one of `on_plaintext` and
    /// `on_error` is called.
    fn decrypt(&self, content: EncryptedContent, on_plaintext: OnPlaintext, on_error: OnDecryptError);
}

/// Checks the signature of received Data
pub trait Validator: Send + Sync {
    /// Validate `data`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the packet is not trusted.
    fn validate(&self, data: &Data) -> Result<(), ValidationError>;
}

/// Signs with a BLAKE3 digest of the signed portion
///
/// Provides integrity but no authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigner;

impl Signer for DigestSigner {
    fn sign(&self, data: &mut Data) -> Result<(), SignError> {
        let portion = data
            .signed_portion(None)
            .map_err(|e| SignError(e.to_string().into()))?;
        data.set_signature(SignatureInfo {
            key_locator: None,
            value: Bytes::copy_from_slice(blake3::hash(&portion).as_bytes()),
        });
        Ok(())
    }
}

/// Accepts Data whose signature is a matching BLAKE3 digest
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestValidator;

impl Validator for DigestValidator {
    fn validate(&self, data: &Data) -> Result<(), ValidationError> {
        let signature = data
            .signature()
            .ok_or_else(|| ValidationError("the Data is not signed".into()))?;
        let portion = data
            .signed_portion(signature.key_locator.as_ref())
            .map_err(|e| ValidationError(e.to_string().into()))?;
        if blake3::hash(&portion).as_bytes() == signature.value.as_ref() {
            Ok(())
        } else {
            Err(ValidationError("digest mismatch".into()))
        }
    }
}
