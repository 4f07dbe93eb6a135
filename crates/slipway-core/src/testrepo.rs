//! Shared git repository fixtures for unit tests.

use git2::{Commit, Oid, Repository, Signature};
use std::path::Path;

/// Init a working repository whose first commit will land on `main`.
pub(crate) fn init(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap();
    repo.set_head("refs/heads/main").unwrap();
    repo
}

/// Init a bare repository with an unborn `main`.
pub(crate) fn init_bare(path: &Path) -> Repository {
    let repo = Repository::init_bare(path).unwrap();
    repo.set_head("refs/heads/main").unwrap();
    repo
}

/// Write `content` to `name` in the worktree and commit it.
pub(crate) fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    let file = workdir.join(name);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&file, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("dev", "dev@forge.local").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Annotated tag at the given commit.
pub(crate) fn tag_annotated(repo: &Repository, name: &str, target: Oid) {
    let sig = Signature::now("dev", "dev@forge.local").unwrap();
    let object = repo.find_object(target, None).unwrap();
    repo.tag(name, &object, &sig, &format!("Release {name}"), false)
        .unwrap();
}

/// Lightweight tag at the given commit.
pub(crate) fn tag_lightweight(repo: &Repository, name: &str, target: Oid) {
    let object = repo.find_object(target, None).unwrap();
    repo.tag_lightweight(name, &object, false).unwrap();
}
