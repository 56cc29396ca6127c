//! Fuzz test for opening encrypted content
//!
//! Structured envelopes with arbitrary nonce and payload bytes must be
//! rejected cleanly under a known key.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nametree_core::{EncryptedContent, Name};
use nametree_crypto::{AeadKey, ContentDecryptor};

#[derive(Debug, Arbitrary)]
struct Envelope {
    payload: Vec<u8>,
    initial_vector: Vec<u8>,
    use_known_key: bool,
}

fuzz_target!(|input: Envelope| {
    let key_name = Name::from_uri("/fuzz/CK").expect("static name");
    let decryptor = ContentDecryptor::new();
    decryptor.add_key(key_name.clone(), AeadKey::new([7u8; 32]));

    let envelope = EncryptedContent {
        payload: input.payload.into(),
        initial_vector: input.initial_vector.into(),
        key_locator: input.use_known_key.then_some(key_name),
    };
    let _ = decryptor.open(&envelope);
});
