#![no_main]

use libfuzzer_sys::fuzz_target;
use locsync::po::{parse, serialize};
use locsync_fuzz::{create_catalog, FuzzEntry};
use pretty_assertions::assert_eq;

fuzz_target!(|entries: Vec<FuzzEntry>| {
    let catalog = create_catalog(entries);
    let text = serialize(&catalog);
    let reparsed = parse(&text).expect("Serialized catalog should parse");
    assert_eq!(reparsed.entries(), catalog.entries());
});
