#![no_main]

use libfuzzer_sys::fuzz_target;
use locsync::po::{parse, serialize};
use pretty_assertions::assert_eq;

fuzz_target!(|text: &str| {
    // Err(_) can happen and it's fine.
    if let Ok(catalog) = parse(text) {
        let reparsed = parse(&serialize(&catalog)).expect("Serialized catalog should parse");
        assert_eq!(reparsed, catalog);
    }
});
