//! Fuzz test for name URI parsing
//!
//! Any name that parses must print to a URI that parses back to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nametree_core::Name;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(name) = Name::from_uri(text) {
            let reparsed = Name::from_uri(&name.to_uri()).expect("printed URI must parse");
            assert_eq!(reparsed, name);
        }
    }
});
