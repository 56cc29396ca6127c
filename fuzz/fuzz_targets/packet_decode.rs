//! Fuzz test for packet decoding
//!
//! Arbitrary bytes decoded as Data or as an encrypted content envelope must
//! never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nametree_core::{Data, EncryptedContent};

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Data::wire_decode(data) {
        let _ = packet.full_name();
        let _ = packet.signed_portion(None);
    }
    let _ = EncryptedContent::wire_decode(data);
});
