#![no_main]
use arbitrary::Arbitrary;
use bucketfs::{FilesystemBuilder, MemoryClient, MemoryObject, TraversalMode};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

#[derive(Arbitrary, Debug)]
struct Input {
    keys: Vec<String>,
    page_size: u8,
    walk: bool,
    deep: bool,
}

// Listings over arbitrary keys must terminate and never repeat a file
fuzz_target!(|input: Input| {
    let traversal = if input.walk { TraversalMode::Walk } else { TraversalMode::Flat };
    let fs = match FilesystemBuilder::new("fuzz-bucket")
        .list_page_size(input.page_size as usize)
        .traversal(traversal)
        .build(MemoryClient::new())
    {
        Ok(fs) => fs,
        Err(_) => return,
    };

    for key in input.keys.iter().take(200) {
        fs.client()
            .insert_object("fuzz-bucket", key, MemoryObject::new(Vec::new()));
    }

    let mut seen = BTreeSet::new();
    for entry in fs.list_contents("", input.deep).take(10_000) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => break,
        };
        if entry.is_file() {
            assert!(seen.insert(entry.path().to_string()));
        }
    }
});
