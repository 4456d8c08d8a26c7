//! Fuzz target for lsof output parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use prox_core::collect::{cwd_from_open_files, parse};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for line in text.lines() {
        let _ = parse::parse_fd_row(line);
    }
    let _ = cwd_from_open_files(&text);
});
