#![no_main]

use std::path::Path;

use capstan::config::{parse_with_warnings, ConfigOverrides};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Parsing and validation must reject bad input, never panic
        let _ = parse_with_warnings(content, Path::new("capstan.toml"), &ConfigOverrides::default());
    }
});
