//! Fuzz target for ps output parsing and fingerprint matching.
//!
//! The first line of the input is used as the fingerprint, the rest as a
//! process listing. Parsing must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use prox_core::collect::{filter_by_name, match_fingerprint, parse};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (fingerprint, listing) = text.split_once('\n').unwrap_or((text.as_ref(), ""));

    for line in listing.lines() {
        let _ = parse::parse_tty_command(line);
        let _ = parse::parse_listing_row(line);
        let _ = parse::parse_arguments(line, fingerprint);
    }
    let _ = match_fingerprint(listing, fingerprint, "??", None);
    let _ = filter_by_name(listing, fingerprint);
});
