//! Cryptographic error types.

use nametree_core::{DecryptError, DecryptErrorCode, EncodingError, Name};
use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (authentication failure)
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,

    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid nonce length
    #[error("invalid nonce length")]
    InvalidNonceLength,

    /// Invalid signature
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The envelope or packet names no key
    #[error("no key locator")]
    MissingKeyLocator,

    /// No key is known under this name
    #[error("unknown key {0}")]
    UnknownKey(Name),

    /// A packet or envelope could not be encoded
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl CryptoError {
    /// Decrypt error code reported to the namespace tree
    #[must_use]
    pub fn decrypt_code(&self) -> DecryptErrorCode {
        match self {
            CryptoError::MissingKeyLocator | CryptoError::UnknownKey(_) => {
                DecryptErrorCode::NoDecryptKey
            }
            CryptoError::InvalidNonceLength | CryptoError::Encoding(_) => {
                DecryptErrorCode::InvalidEncryptedFormat
            }
            CryptoError::DecryptionFailed => DecryptErrorCode::DecryptionFailure,
            _ => DecryptErrorCode::General,
        }
    }
}

impl From<CryptoError> for DecryptError {
    fn from(error: CryptoError) -> Self {
        DecryptError::new(error.decrypt_code(), error.to_string())
    }
}
