//! Fuzz target for config file deserialization.

#![no_main]

use libfuzzer_sys::fuzz_target;
use prox_core::config::ProxConfig;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<ProxConfig>(data);
});
