use super::*;

#[test]
fn trash_key_round_trips_through_redb_bytes() {
    let key = TrashKey::try_new("books/publisher-a/book-b").unwrap();

    let bytes = <TrashKey as redb::Value>::as_bytes(&key);
    let key_from_bytes = <TrashKey as redb::Value>::from_bytes(bytes);
    assert_eq!(key, key_from_bytes);
}

#[test]
fn trash_key_rejects_whitespace_string() {
    TrashKey::try_new("   ").unwrap_err();
}

#[test]
fn trash_key_derives_from_location() {
    let bucket = Bucket::try_new("books").unwrap();
    let path = ObjectPath::try_new("/publisher-a/book-b/").unwrap();

    let key = TrashKey::derive(&bucket, &path);
    assert_eq!(key.as_str(), "books/publisher-a/book-b");
}

#[test]
fn trash_slot_is_stable_and_flat() {
    let key = TrashKey::try_new("apps/android/1.2.0").unwrap();

    assert_eq!(key.trash_slot(), key.trash_slot());
    assert!(!key.trash_slot().contains('/'));
    assert_eq!(key.trash_slot().len(), 64);
}

#[test]
fn bucket_rejects_uppercase_and_slashes() {
    Bucket::try_new("Books").unwrap_err();
    Bucket::try_new("books/a").unwrap_err();
    Bucket::try_new(".hidden").unwrap_err();
    Bucket::try_new("teacher-materials").unwrap();
}

#[test]
fn object_path_rejects_traversal() {
    ObjectPath::try_new("a/../b").unwrap_err();
    ObjectPath::try_new("a//b").unwrap_err();
    ObjectPath::try_new("./a").unwrap_err();
    ObjectPath::try_new("a\\b").unwrap_err();
    ObjectPath::try_new("/").unwrap_err();
}

#[test]
fn object_path_join_validates_child() {
    let path = ObjectPath::try_new("book-1").unwrap();

    assert_eq!(path.join("1.0.0").unwrap().as_str(), "book-1/1.0.0");
    path.join("..").unwrap_err();
}

#[test]
fn justification_rejects_blank_text() {
    Justification::try_new("").unwrap_err();
    Justification::try_new(" \t\n ").unwrap_err();

    let reason = Justification::try_new("  approved by X  ").unwrap();
    assert_eq!(reason.as_str(), "approved by X");
}

#[test]
fn trash_key_ordering_matches_string_ordering() {
    const KEYS: [&str; 4] = ["apps/a", "books/a", "apps/a/b", "apps/ab"];

    for l in KEYS.iter() {
        for r in KEYS.iter() {
            let key_l = TrashKey::try_new(*l).unwrap();
            let key_r = TrashKey::try_new(*r).unwrap();
            assert_eq!(key_l.cmp(&key_r), l.cmp(r), "Comparing '{}' and '{}'", l, r);
        }
    }
}
