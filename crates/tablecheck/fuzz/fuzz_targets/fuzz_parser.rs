//! Fuzz target for the delimited-file parser.
//!
//! The parser must never panic on malformed input, whatever delimiter it
//! detects and however the columns end up typed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tablecheck::input::Parser;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = Parser::new().parse_file(temp_file.path());
        }
    }

    for delimiter in [b',', b'\t', b';', b'|'] {
        let _ = Parser::new().parse_bytes(data, delimiter);
    }
});
