use std::path::Path;

use vsnap::*;

pub fn create_repo(dir: &Path) -> Repository {
    Repository::open(dir, OpenOptions {
        create: true,
        ..Default::default()
    })
    .unwrap()
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[allow(dead_code)]
pub fn save(repo: &Repository) -> SaveOutcome {
    repo.save(&SaveOptions::default()).unwrap()
}

/// Repository saved once with `hello.txt`, `dir/a.txt` and `dir/b.txt`.
#[allow(dead_code)]
pub fn repo_with_files(dir: &Path) -> Repository {
    write_file(dir, "hello.txt", "hello");
    write_file(dir, "dir/a.txt", "aaa");
    write_file(dir, "dir/b.txt", "bbb");
    let repo = create_repo(dir);
    save(&repo);
    repo
}

/// Entries of the head version's root tree, keyed by name.
#[allow(dead_code)]
pub fn root_entries(repo: &Repository) -> std::collections::BTreeMap<String, TreeEntry> {
    let head = repo.head().unwrap().unwrap();
    let version = repo.store().get_version(head).unwrap();
    repo.store().tree_entries(version.tree).unwrap()
}

#[allow(dead_code)]
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
