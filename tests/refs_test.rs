//! Integration tests for reference resolution and name lookup.
//!
//! Test cases: RS-001 to RS-008

use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use looseleaf::objects::{ObjectKind, Oid};
use looseleaf::refs::RefStore;
use looseleaf::repository::Repository;
use looseleaf::{Error, RefNode};

fn init_repo() -> (TempDir, Repository) {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    (temp, repo)
}

/// Finds two blob payloads whose ids share the first four hex digits.
fn colliding_blobs() -> (Vec<u8>, Vec<u8>) {
    let mut seen: HashMap<String, Vec<u8>> = HashMap::new();
    for i in 0.. {
        let content = format!("candidate {}", i).into_bytes();
        let prefix = Oid::for_object(ObjectKind::Blob, &content).to_hex()[..4].to_string();
        if let Some(previous) = seen.insert(prefix, content.clone()) {
            return (previous, content);
        }
    }
    unreachable!()
}

// RS-001: HEAD -> refs/heads/master -> id
#[test]
fn test_rs001_chain() {
    let (temp, repo) = init_repo();
    let oid = Oid::for_object(ObjectKind::Blob, b"x");
    fs::write(
        temp.path().join(".git/refs/heads/master"),
        format!("{}\n", oid),
    )
    .unwrap();

    assert_eq!(repo.ref_store().resolve("HEAD").unwrap(), Some(oid));
}

// RS-002: a missing HEAD file is absence, not an error
#[test]
fn test_rs002_missing_head() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();
    let store = RefStore::new(temp.path().join(".git"));

    assert_eq!(store.resolve("HEAD").unwrap(), None);
}

// RS-003: cyclic symbolic refs fail
#[test]
fn test_rs003_cycle() {
    let (temp, repo) = init_repo();
    let heads = temp.path().join(".git/refs/heads");
    fs::write(heads.join("master"), "ref: refs/heads/other\n").unwrap();
    fs::write(heads.join("other"), "ref: refs/heads/master\n").unwrap();

    assert!(matches!(
        repo.ref_store().resolve("HEAD"),
        Err(Error::ReferenceCycle(_))
    ));
    assert!(matches!(repo.find("HEAD", None, true), Err(Error::ReferenceCycle(_))));
}

// RS-004: a short prefix shared by two objects is ambiguous
#[test]
fn test_rs004_ambiguous_prefix() {
    let (_temp, repo) = init_repo();
    let (first, second) = colliding_blobs();
    let a = repo.hash_object(&first, ObjectKind::Blob, true).unwrap();
    let b = repo.hash_object(&second, ObjectKind::Blob, true).unwrap();
    let prefix = &a.to_hex()[..4];

    match repo.find(prefix, None, true) {
        Err(Error::AmbiguousReference { name, candidates }) => {
            assert_eq!(name, prefix);
            assert_eq!(candidates.len(), 2);
            assert!(candidates.contains(&a.to_hex()));
            assert!(candidates.contains(&b.to_hex()));
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }

    // a longer prefix picks one
    let longer = &a.to_hex()[..12];
    assert_eq!(repo.find(longer, None, true).unwrap(), a);
}

// RS-005: short names search tags, then branches, then remotes
#[test]
fn test_rs005_name_namespaces() {
    let (temp, repo) = init_repo();
    let blob = repo.hash_object(b"one", ObjectKind::Blob, true).unwrap();
    let other = repo.hash_object(b"two", ObjectKind::Blob, true).unwrap();
    let store = repo.ref_store();

    store.create("refs/remotes/origin/main", &blob).unwrap();
    assert_eq!(repo.find("origin/main", None, true).unwrap(), blob);

    store.create("refs/tags/same", &blob).unwrap();
    store.create("refs/heads/same", &other).unwrap();
    assert!(matches!(
        repo.find("same", None, true),
        Err(Error::AmbiguousReference { .. })
    ));

    // a tag and a branch at the same object are still two candidates
    store.create("refs/heads/same", &blob).unwrap();
    assert_eq!(repo.resolve_candidates("same").unwrap(), vec![blob, blob]);
    match repo.find("same", None, true) {
        Err(Error::AmbiguousReference { name, candidates }) => {
            assert_eq!(name, "same");
            assert_eq!(candidates, vec![blob.to_hex(), blob.to_hex()]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }

    assert!(temp.path().join(".git/refs/remotes/origin/main").is_file());
}

// RS-006: refs() nests by directory
#[test]
fn test_rs006_list() {
    let (_temp, repo) = init_repo();
    let blob = repo.hash_object(b"one", ObjectKind::Blob, true).unwrap();
    repo.ref_store().create("refs/tags/v1", &blob).unwrap();
    repo.ref_store().create("refs/heads/topic/x", &blob).unwrap();

    let refs = repo.refs().unwrap();
    match &refs["tags"] {
        RefNode::Dir(tags) => assert_eq!(tags["v1"], RefNode::Ref(blob)),
        other => panic!("expected dir, got {:?}", other),
    }
    match &refs["heads"] {
        RefNode::Dir(heads) => {
            // master has no commit yet and is left out
            assert!(!heads.contains_key("master"));
            assert!(matches!(heads["topic"], RefNode::Dir(_)));
        }
        other => panic!("expected dir, got {:?}", other),
    }
}

// RS-007: a ref to an object missing from the store still resolves
#[test]
fn test_rs007_dangling_ref() {
    let (_temp, repo) = init_repo();
    let missing = Oid::for_object(ObjectKind::Commit, b"never stored");
    repo.ref_store().create("refs/heads/gone", &missing).unwrap();

    assert_eq!(repo.find("gone", None, true).unwrap(), missing);
    assert_eq!(repo.find("gone", Some(ObjectKind::Commit), true).unwrap(), missing);
    assert_eq!(repo.find("gone", Some(ObjectKind::Tree), true).unwrap(), missing);
}

// RS-008: hex-looking names match lowercase refs and ids in any case
#[test]
fn test_rs008_hex_name_case() {
    let (_temp, repo) = init_repo();
    let blob = repo.hash_object(b"one", ObjectKind::Blob, true).unwrap();
    let other = repo.hash_object(b"two", ObjectKind::Blob, true).unwrap();
    repo.ref_store().create("refs/heads/cafe", &blob).unwrap();

    assert_eq!(repo.find("CAFE", None, true).unwrap(), blob);
    assert_eq!(repo.find("Cafe", None, true).unwrap(), blob);

    let upper = other.to_hex()[..10].to_ascii_uppercase();
    assert_eq!(repo.find(&upper, None, true).unwrap(), other);
}
