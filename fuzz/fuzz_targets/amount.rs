#![no_main]

use libfuzzer_sys::fuzz_target;
use soroban_bets::codec::{format_amount, to_minor_units};

fuzz_target!(|major: f64| {
    if let Ok(minor) = to_minor_units(major) {
        assert!(minor > 0);
        let _ = format_amount(minor);
    }
});
