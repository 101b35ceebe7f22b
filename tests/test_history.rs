mod common;

use vsnap::*;

fn repo_with_three_versions(dir: &std::path::Path) -> Repository {
    common::write_file(dir, "a.txt", "1");
    let repo = common::create_repo(dir);
    common::save(&repo);
    common::write_file(dir, "a.txt", "2");
    repo.save(&SaveOptions {
        message: Some("second".into()),
    })
    .unwrap();
    common::write_file(dir, "b/c.txt", "3");
    common::save(&repo);
    repo
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

#[test]
fn history_is_empty_before_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let repo = common::create_repo(dir.path());
    assert!(repo.history().unwrap().is_empty());
}

#[test]
fn history_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_with_three_versions(dir.path());

    let history = repo.history().unwrap();
    let ids: Vec<u64> = history.iter().map(|(id, _)| id.0).collect();
    assert_eq!(ids, vec![2, 1, 0]);

    let messages: Vec<&str> = history.iter().map(|(_, v)| v.message.as_str()).collect();
    assert_eq!(messages, vec!["Version 2", "second", "Initial save"]);

    // Chain terminates at a version without parent.
    assert_eq!(history[0].1.parent, Some(VersionId(1)));
    assert_eq!(history[1].1.parent, Some(VersionId(0)));
    assert_eq!(history[2].1.parent, None);
}

#[test]
fn no_change_save_does_not_extend_history() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_with_three_versions(dir.path());
    common::save(&repo);
    assert_eq!(repo.history().unwrap().len(), 3);
}

#[test]
fn history_detects_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_with_three_versions(dir.path());
    let version0 = dir.path().join(".vsnap/obj/version/0");
    std::fs::write(&version0, "2\n0\nlooped").unwrap();

    let err = repo.history().unwrap_err();
    assert!(matches!(err, Error::CorruptObject(_)));
    assert!(err.needs_recovery());
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

#[test]
fn verify_walks_every_version() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_with_three_versions(dir.path());
    assert_eq!(repo.verify().unwrap(), 3);
}

#[test]
fn verify_reports_missing_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_with_three_versions(dir.path());
    let root = common::root_entries(&repo);
    let sub = match &root["b"] {
        TreeEntry::Tree { id, .. } => *id,
        other => panic!("expected tree, got {:?}", other),
    };
    std::fs::remove_file(dir.path().join(".vsnap/obj/tree").join(sub.to_string())).unwrap();

    match repo.verify().unwrap_err() {
        Error::VersionUnreadable { id, source } => {
            assert_eq!(id, 2);
            assert!(matches!(*source, Error::MissingReference(_)));
        }
        other => panic!("expected VersionUnreadable, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// counters
// ---------------------------------------------------------------------------

#[test]
fn counters_strictly_increase() {
    let dir = tempfile::tempdir().unwrap();
    let repo = common::create_repo(dir.path());
    let ids: Vec<u64> = (0..10)
        .map(|_| repo.counters().next_index(IndexClass::Tree).unwrap())
        .collect();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
    assert_eq!(repo.counters().peek(IndexClass::Version).unwrap(), 0);
}
