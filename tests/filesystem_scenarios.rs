//! End-to-end filesystem scenarios against the in-memory backend

use bucketfs::{
    Config, FilesystemBuilder, MemoryClient, MemoryObject, ObjectFilesystem, Operation,
    StorageAttributes, TraversalMode, Visibility,
};

const BUCKET: &str = "scenario-bucket";

/// Helper to create a filesystem rooted at `prefix`
fn create_fs(prefix: &str) -> ObjectFilesystem<MemoryClient> {
    FilesystemBuilder::new(BUCKET)
        .prefix(prefix)
        .build(MemoryClient::new())
        .unwrap()
}

fn paths(fs: &ObjectFilesystem<MemoryClient>, path: &str, deep: bool) -> Vec<String> {
    fs.list_contents(path, deep)
        .map(|entry| entry.unwrap().path().to_string())
        .collect()
}

#[test]
fn test_write_then_read() {
    let fs = create_fs("");
    fs.write("a/b.txt", b"hello", &Config::new()).unwrap();

    assert_eq!(fs.read("a/b.txt").unwrap(), b"hello");
    assert!(fs.file_exists("a/b.txt").unwrap());
    assert!(!fs.file_exists("a/c.txt").unwrap());
}

#[test]
fn test_write_overwrites() {
    let fs = create_fs("");
    fs.write("note.txt", b"first", &Config::new()).unwrap();
    fs.write("note.txt", b"second", &Config::new()).unwrap();

    assert_eq!(fs.read("note.txt").unwrap(), b"second");
    assert_eq!(fs.client().keys(BUCKET), vec!["note.txt"]);
}

#[test]
fn test_create_directory_then_list() {
    let fs = create_fs("");
    fs.create_directory("a/b", &Config::new()).unwrap();

    assert!(fs.directory_exists("a/b").unwrap());

    let entries: Vec<StorageAttributes> = fs
        .list_contents("a", true)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_dir());
    assert_eq!(entries[0].path(), "a/b");
}

#[test]
fn test_directory_entry_arrives_before_deeper_entries() {
    let fs = FilesystemBuilder::new(BUCKET)
        .traversal(TraversalMode::Walk)
        .build(MemoryClient::new())
        .unwrap();
    fs.create_directory("a/b", &Config::new()).unwrap();
    fs.write("a/b/c/deep.txt", b"x", &Config::new()).unwrap();

    let mut listing = fs.list_contents("a", true);
    let first = listing.next().unwrap().unwrap();
    assert_eq!(first.path(), "a/b");
    assert!(first.is_dir());
    // Only the first level has been requested so far
    assert_eq!(fs.client().calls(Operation::ListObjects), 1);

    let rest: Vec<String> = listing.map(|e| e.unwrap().path().to_string()).collect();
    assert_eq!(rest, vec!["a/b/c", "a/b/c/deep.txt"]);
}

#[test]
fn test_copy_then_delete_moves_content() {
    let fs = create_fs("root");
    fs.write("a/b.txt", b"original", &Config::new()).unwrap();

    fs.copy("a/b.txt", "a/c.txt", &Config::new()).unwrap();
    fs.delete("a/b.txt").unwrap();

    assert_eq!(fs.read("a/c.txt").unwrap(), b"original");
    assert!(!fs.file_exists("a/b.txt").unwrap());
}

#[test]
fn test_move_file() {
    let fs = create_fs("root");
    fs.write("inbox/report.pdf", b"%PDF", &Config::new()).unwrap();

    fs.move_file("inbox/report.pdf", "archive/report.pdf", &Config::new())
        .unwrap();

    assert_eq!(fs.client().keys(BUCKET), vec!["root/archive/report.pdf"]);
    assert_eq!(fs.read("archive/report.pdf").unwrap(), b"%PDF");
}

#[test]
fn test_move_onto_itself_keeps_file() {
    let fs = create_fs("root");
    fs.write("a.txt", b"only copy", &Config::new()).unwrap();

    fs.move_file("a.txt", "a.txt", &Config::new()).unwrap();
    fs.move_file("/a.txt", "a.txt", &Config::new()).unwrap();

    assert_eq!(fs.read("a.txt").unwrap(), b"only copy");
    assert_eq!(fs.client().calls(Operation::CopyObject), 0);
    assert_eq!(fs.client().calls(Operation::DeleteObject), 0);
}

#[test]
fn test_keys_with_repeated_delimiters_stay_addressable() {
    let fs = create_fs("root");
    fs.client()
        .insert_object(BUCKET, "root/a//b.txt", MemoryObject::new(b"double".to_vec()));
    fs.client()
        .insert_object(BUCKET, "root/a/b.txt", MemoryObject::new(b"single".to_vec()));

    assert_eq!(paths(&fs, "a", true), vec!["a//b.txt", "a/b.txt"]);
    assert_eq!(fs.read("a//b.txt").unwrap(), b"double");
    assert_eq!(fs.metadata("a//b.txt").unwrap().size, Some(6));

    fs.move_file("a//b.txt", "a//c.txt", &Config::new()).unwrap();
    assert_eq!(
        fs.client().keys(BUCKET),
        vec!["root/a//c.txt", "root/a/b.txt"]
    );

    fs.delete("a//c.txt").unwrap();
    assert_eq!(fs.read("a/b.txt").unwrap(), b"single");
}

#[test]
fn test_walk_names_repeated_delimiter_prefix_apart() {
    let fs = FilesystemBuilder::new(BUCKET)
        .prefix("root")
        .traversal(TraversalMode::Walk)
        .build(MemoryClient::new())
        .unwrap();
    fs.client()
        .insert_object(BUCKET, "root/a//b.txt", MemoryObject::new(Vec::new()));
    fs.client()
        .insert_object(BUCKET, "root/a/b.txt", MemoryObject::new(Vec::new()));

    let entries: Vec<StorageAttributes> = fs
        .list_contents("a", true)
        .collect::<Result<_, _>>()
        .unwrap();
    let kinds: Vec<(&str, bool)> = entries.iter().map(|e| (e.path(), e.is_dir())).collect();
    assert_eq!(
        kinds,
        vec![("a/b.txt", false), ("a/", true), ("a//b.txt", false)]
    );
}

#[test]
fn test_copy_applies_visibility() {
    let fs = create_fs("");
    fs.write("private.txt", b"x", &Config::new().with_visibility(Visibility::Private))
        .unwrap();
    fs.copy(
        "private.txt",
        "public.txt",
        &Config::new().with_visibility(Visibility::Public),
    )
    .unwrap();

    assert_eq!(
        fs.visibility("public.txt").unwrap().visibility,
        Some(Visibility::Public)
    );
    assert_eq!(
        fs.visibility("private.txt").unwrap().visibility,
        Some(Visibility::Private)
    );
}

#[test]
fn test_shallow_and_deep_listing() {
    let fs = create_fs("root");
    for path in ["docs/a.txt", "docs/b.txt", "docs/sub/c.txt", "docs/sub/more/d.txt"] {
        fs.write(path, b"data", &Config::new()).unwrap();
    }
    fs.write("elsewhere.txt", b"data", &Config::new()).unwrap();

    assert_eq!(
        paths(&fs, "docs", false),
        vec!["docs/a.txt", "docs/b.txt", "docs/sub"]
    );
    assert_eq!(
        paths(&fs, "docs", true),
        vec!["docs/a.txt", "docs/b.txt", "docs/sub/c.txt", "docs/sub/more/d.txt"]
    );
    assert_eq!(
        paths(&fs, "", false),
        vec!["elsewhere.txt", "docs"]
    );
}

#[test]
fn test_listing_distinguishes_markers_by_trailing_delimiter() {
    let fs = create_fs("");
    fs.client()
        .insert_object(BUCKET, "photos/2024/", MemoryObject::new(Vec::new()));
    fs.client()
        .insert_object(BUCKET, "photos/2024.jpg", MemoryObject::new(Vec::new()));

    let entries: Vec<StorageAttributes> = fs
        .list_contents("photos", true)
        .collect::<Result<_, _>>()
        .unwrap();

    let kinds: Vec<(&str, bool)> = entries.iter().map(|e| (e.path(), e.is_dir())).collect();
    assert_eq!(kinds, vec![("photos/2024.jpg", false), ("photos/2024", true)]);
}

#[test]
fn test_listing_file_attributes() {
    let fs = create_fs("root");
    fs.write("data/table.csv", b"a,b\n1,2\n", &Config::new()).unwrap();

    let entry = fs.list_contents("data", false).next().unwrap().unwrap();
    let file = entry.as_file().unwrap();
    assert_eq!(file.path, "data/table.csv");
    assert_eq!(file.size, Some(8));
    assert!(file.last_modified.unwrap() > 0);
    assert_eq!(file.mime_type, None);
}

#[test]
fn test_metadata_without_last_modified_is_zero() {
    let fs = create_fs("");
    fs.client().insert_object(
        BUCKET,
        "legacy.bin",
        MemoryObject::new(vec![0u8; 3]).with_last_modified(None),
    );

    let attrs = fs.metadata("legacy.bin").unwrap();
    assert_eq!(attrs.last_modified, Some(0));
    assert_eq!(attrs.size, Some(3));
    assert_eq!(fs.last_modified("legacy.bin").unwrap().last_modified, Some(0));
}

#[test]
fn test_delete_directory_removes_subtree() {
    let fs = create_fs("root");
    fs.create_directory("tree", &Config::new()).unwrap();
    fs.write("tree/a.txt", b"1", &Config::new()).unwrap();
    fs.create_directory("tree/branch", &Config::new()).unwrap();
    fs.write("tree/branch/b.txt", b"2", &Config::new()).unwrap();
    fs.write("treetop.txt", b"3", &Config::new()).unwrap();

    fs.delete_directory("tree").unwrap();

    assert!(!fs.directory_exists("tree").unwrap());
    assert_eq!(fs.client().keys(BUCKET), vec!["root/treetop.txt"]);
}

#[test]
fn test_root_directory_always_exists() {
    let fs = create_fs("root");
    assert!(fs.directory_exists("").unwrap());
    assert!(fs.directory_exists("/").unwrap());
    assert_eq!(fs.client().calls(Operation::ListObjects), 0);
}

#[test]
fn test_json_tagged_attributes() {
    let fs = create_fs("");
    fs.create_directory("d", &Config::new()).unwrap();
    fs.write("d/f.txt", b"abc", &Config::new()).unwrap();

    let entries: Vec<serde_json::Value> = fs
        .list_contents("", true)
        .map(|e| serde_json::to_value(e.unwrap()).unwrap())
        .collect();

    assert_eq!(entries[0]["type"], "dir");
    assert_eq!(entries[0]["path"], "d");
    assert_eq!(entries[1]["type"], "file");
    assert_eq!(entries[1]["file_size"], 3);
}
