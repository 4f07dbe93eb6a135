//! Thin façade over libgit2: clone, pull, commit, tag, push.
//!
//! All remote operations authenticate with a single process-wide SSH key
//! loaded into memory at startup. Local transports (used by tests) never
//! invoke the credential callback.

use crate::error::{Result, SlipwayError};
use git2::build::CheckoutBuilder;
use git2::{Cred, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository, Signature};
use std::path::Path;

// ---------------------------------------------------------------------------
// SshKey
// ---------------------------------------------------------------------------

/// The controller's SSH private key, read once at startup and shared by
/// every clone, fetch, and push.
#[derive(Clone)]
pub struct SshKey {
    private: String,
}

impl std::fmt::Debug for SshKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshKey").field("private", &"<redacted>").finish()
    }
}

impl SshKey {
    pub fn load(path: &Path) -> Result<Self> {
        let private = std::fs::read_to_string(path)?;
        Ok(Self { private })
    }

    /// Only used by tests, where the key is never presented to a transport.
    pub fn unused() -> Self {
        Self {
            private: String::new(),
        }
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let key = self.private.clone();
        let mut cb = RemoteCallbacks::new();
        cb.credentials(move |_url, username_from_url, _allowed| {
            Cred::ssh_key_from_memory(username_from_url.unwrap_or("git"), None, &key, None)
        });
        cb
    }
}

// ---------------------------------------------------------------------------
// CommitAuthor
// ---------------------------------------------------------------------------

/// Author/committer identity for CI commits and tags.
#[derive(Debug, Clone)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    fn signature(&self) -> Result<Signature<'static>> {
        Ok(Signature::now(&self.name, &self.email)?)
    }
}

// ---------------------------------------------------------------------------
// Clone / pull
// ---------------------------------------------------------------------------

/// Single-branch clone of `url` at `branch` into `dest`.
///
/// libgit2's builder clones every branch, so the single-branch contract is
/// implemented directly: init, fetch the one refspec, then create and check
/// out the local branch.
pub fn clone(url: &str, branch: &str, dest: &Path, remote_name: &str, key: &SshKey) -> Result<()> {
    let repo = Repository::init(dest)?;
    {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote_name}/{branch}");
        let mut remote = repo.remote_with_fetch(remote_name, url, &refspec)?;
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(key.callbacks());
        // An empty refspec list fetches the remote's configured refspec,
        // which updates the tracking ref the checkout below reads.
        remote.fetch(&[] as &[&str], Some(&mut opts), None)?;
    }
    let tracking = format!("refs/remotes/{remote_name}/{branch}");
    let commit = repo.find_reference(&tracking)?.peel_to_commit()?;
    repo.branch(branch, &commit, true)?;
    repo.set_head(&format!("refs/heads/{branch}"))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

/// Fetch `branch` from the remote and force-fast-forward the local branch.
/// An already-up-to-date worktree is success; divergence is an error.
pub fn pull(worktree: &Path, branch: &str, remote_name: &str, key: &SshKey) -> Result<()> {
    let repo = Repository::open(worktree)?;
    {
        let mut remote = repo.find_remote(remote_name)?;
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(key.callbacks());
        remote.fetch(&[branch], Some(&mut opts), None)?;
    }

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        return Ok(());
    }
    if analysis.is_fast_forward() {
        let refname = format!("refs/heads/{branch}");
        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(fetch_commit.id(), "fast-forward")?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        return Ok(());
    }
    Err(SlipwayError::NonFastForward {
        branch: branch.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Commit / tag
// ---------------------------------------------------------------------------

/// Stage everything (`*`) and commit with the CI author. Equivalent of
/// `git add -A && git commit -m <message>`.
pub fn commit_all(worktree: &Path, message: &str, author: &CommitAuthor) -> Result<()> {
    let repo = Repository::open(worktree)?;
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let sig = author.signature()?;
    let parent = repo.head()?.peel_to_commit()?;
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
    Ok(())
}

/// Create an annotated tag `name` at HEAD.
///
/// Re-running after a partial failure must not fail: if the tag already
/// exists and resolves to the current HEAD it is accepted as done; an
/// existing tag pointing anywhere else is an error.
pub fn create_tag(worktree: &Path, name: &str, message: &str, author: &CommitAuthor) -> Result<()> {
    let repo = Repository::open(worktree)?;
    let head = repo.head()?.peel_to_commit()?;

    let refname = format!("refs/tags/{name}");
    if let Ok(existing) = repo.find_reference(&refname) {
        if existing.peel_to_commit()?.id() == head.id() {
            return Ok(());
        }
        return Err(SlipwayError::TagTargetMismatch {
            tag: name.to_string(),
            target: head.id().to_string(),
        });
    }

    let sig = author.signature()?;
    let object = repo.find_object(head.id(), None)?;
    repo.tag(name, &object, &sig, message, false)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// Push the branch head. A push with nothing to update is a no-op success
/// in libgit2, which matches the "already up to date" contract.
pub fn push_branch(worktree: &Path, branch: &str, remote_name: &str, key: &SshKey) -> Result<()> {
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    push(worktree, remote_name, &[refspec], key)
}

/// Push all tags (`refs/tags/*:refs/tags/*`).
pub fn push_tags(worktree: &Path, remote_name: &str, key: &SshKey) -> Result<()> {
    push(worktree, remote_name, &["refs/tags/*:refs/tags/*".to_string()], key)
}

fn push(worktree: &Path, remote_name: &str, refspecs: &[String], key: &SshKey) -> Result<()> {
    let repo = Repository::open(worktree)?;
    let mut remote = repo.find_remote(remote_name)?;
    let mut opts = PushOptions::new();
    opts.remote_callbacks(key.callbacks());
    remote.push(refspecs, Some(&mut opts))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
