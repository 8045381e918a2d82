#![no_main]

use capstan::domain::value_objects::Host;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(spec) = std::str::from_utf8(data) {
        if let Ok(host) = Host::parse(spec) {
            // A parsed host never has an empty address
            assert!(!host.address().is_empty());
            let _ = host.ssh_destination();
        }
    }
});
