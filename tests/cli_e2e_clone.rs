//! End-to-end tests for `clone` and `log`.

mod common;
use common::prelude::*;

#[test]
fn test_clone_reconstructs_latest_content() {
    let fixture = TestFixture::new().with_file("proj", "a.txt", "hello");
    fixture.init("proj");
    fixture.commit("proj", "first", &["a.txt"]);
    fixture.write("proj", "a.txt", "hello world");
    fixture.commit("proj", "second", &["a.txt"]);

    fixture
        .command("")
        .args(["clone", "repo-proj", "copy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cloned repo-proj (1 files)"));

    assert_eq!(fixture.read("copy", "a.txt"), "hello world");
    assert_eq!(fixture.read("copy", ".sync/diff/a.txt"), "hello world");
}

#[test]
fn test_clone_accepts_name_without_prefix() {
    let fixture = TestFixture::new().with_file("proj", "docs/guide.md", "# Guide\n");
    fixture.init("proj");
    fixture.commit("proj", "docs", &["docs/guide.md"]);

    fixture
        .command("elsewhere")
        .args(["clone", "proj"])
        .assert()
        .success();

    assert_eq!(fixture.read("elsewhere/proj", "docs/guide.md"), "# Guide\n");
}

#[test]
fn test_cloned_copy_can_commit() {
    let fixture = TestFixture::new().with_file("proj", "a.txt", "one\n");
    fixture.init("proj");
    fixture.commit("proj", "first", &["a.txt"]);

    fixture
        .command("")
        .args(["clone", "repo-proj", "copy"])
        .assert()
        .success();
    fixture.write("copy", "a.txt", "one\ntwo\n");
    fixture.commit("copy", "from copy", &["a.txt"]);

    fixture
        .command("")
        .args(["clone", "repo-proj", "third"])
        .assert()
        .success();
    assert_eq!(fixture.read("third", "a.txt"), "one\ntwo\n");
}

#[test]
fn test_clone_skips_unsafe_entries_and_fails() {
    use dynasync::diff::PatchKind;
    use dynasync::index::IndexMerger;
    use dynasync::record::CommitRecord;
    use dynasync::store::{FileStore, RemoteStore};

    let fixture = TestFixture::new().with_file("proj", "a.txt", "hello");
    fixture.init("proj");
    fixture.commit("proj", "first", &["a.txt"]);

    let store = FileStore::open(fixture.store()).unwrap();
    let planted = CommitRecord {
        repo: "repo-proj".to_string(),
        commit_date: 1,
        file: "../escape.txt".to_string(),
        author: "mallory".to_string(),
        diff: "owned".to_string(),
        kind: PatchKind::Full,
        message: "m".to_string(),
    };
    store
        .put_item("repo-proj", &planted.key(), &planted.to_item())
        .unwrap();
    IndexMerger::new(&store)
        .merge_commit("repo-proj", &planted.file, planted.commit_date)
        .unwrap();

    fixture
        .command("")
        .args(["clone", "repo-proj", "copy"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Cloned repo-proj (1 files)"))
        .stderr(predicate::str::contains("1 of 2 files in repo-proj could not be reconstructed"));

    assert_eq!(fixture.read("copy", "a.txt"), "hello");
    assert!(!fixture.path().join("work/escape.txt").exists());
}

#[test]
fn test_clone_missing_repository_fails_with_hint() {
    let fixture = TestFixture::new();

    fixture
        .command("")
        .args(["clone", "repo-nothing", "copy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository not found: repo-nothing"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_clone_refuses_existing_working_copy() {
    let fixture = TestFixture::new().with_file("proj", "a.txt", "x");
    fixture.init("proj");

    fixture
        .command("")
        .args(["clone", "repo-proj", "proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already a working copy"));
}

#[test]
fn test_log_lists_history_in_order() {
    let fixture = TestFixture::new().with_file("proj", "a.txt", "v1");
    fixture.init("proj");
    fixture.commit("proj", "first change", &["a.txt"]);
    fixture.write("proj", "a.txt", "v2");
    fixture.commit("proj", "second change", &["a.txt"]);

    let output = fixture
        .command("proj")
        .args(["log", "a.txt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let first = text.find("first change").unwrap();
    let second = text.find("second change").unwrap();
    assert!(first < second);
    assert!(text.contains("tester"));
}
