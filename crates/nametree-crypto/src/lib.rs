//! # nametree Crypto
//!
//! Concrete security collaborators for the nametree namespace tree.
//!
//! This crate provides:
//! - Ed25519 key wrappers and a [`Signer`](nametree_core::Signer) that signs
//!   produced Data under a named key
//! - A [`Validator`](nametree_core::Validator) that checks Ed25519 Data
//!   signatures against a set of trusted named keys
//! - `XChaCha20-Poly1305` content keys, an encryptor producing
//!   [`EncryptedContent`](nametree_core::EncryptedContent) envelopes and a
//!   [`Decryptor`](nametree_core::Decryptor) that opens them
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | Data signatures | Ed25519 | 128-bit |
//! | Content encryption | XChaCha20-Poly1305 | 256-bit key |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod aead;
pub mod content;
pub mod error;
pub mod signatures;
pub mod signing;

pub use aead::{AeadKey, Nonce};
pub use content::{ContentDecryptor, ContentEncryptor};
pub use error::CryptoError;
pub use signatures::{Signature, SigningKey, VerifyingKey};
pub use signing::{Ed25519Signer, Ed25519Validator};

/// XChaCha20-Poly1305 key size
pub const XCHACHA_KEY_SIZE: usize = 32;

/// XChaCha20-Poly1305 nonce size
pub const XCHACHA_NONCE_SIZE: usize = 24;

/// XChaCha20-Poly1305 authentication tag size
pub const XCHACHA_TAG_SIZE: usize = 16;

/// Ed25519 public key size
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 secret key size
pub const ED25519_SECRET_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const ED25519_SIGNATURE_SIZE: usize = 64;
