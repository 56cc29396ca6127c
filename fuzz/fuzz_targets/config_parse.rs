//! Fuzz test for configuration file parsing
//!
//! Tests that arbitrary TOML input doesn't cause panics when parsed as a
//! tree configuration.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nametree_core::TreeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = TreeConfig::from_toml_str(s) {
            let _ = config.validate();
            let _ = config.to_toml_string();
        }
    }
});
