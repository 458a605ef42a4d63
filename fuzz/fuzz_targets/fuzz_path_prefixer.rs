#![no_main]
use arbitrary::Arbitrary;
use bucketfs::PathPrefixer;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    root: &'a str,
    path: &'a str,
}

fuzz_target!(|input: Input| {
    let prefixer = PathPrefixer::new(input.root);
    let prefix = prefixer.prefix();
    assert!(prefix.is_empty() || prefix.ends_with('/'));
    assert!(!prefix.starts_with('/'));

    let key = prefixer.prefix_path(input.path);
    assert!(key.starts_with(prefix));
    let _ = prefixer.strip_prefix(&key);

    let dir = prefixer.prefix_directory_path(input.path);
    assert!(dir.is_empty() || dir.ends_with('/'));
    assert!(!dir.ends_with("//"));
    let _ = prefixer.strip_directory_prefix(&dir);
});
