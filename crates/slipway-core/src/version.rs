//! Next-version calculation from conventional-commit history.
//!
//! A release tag is a tag whose name is exactly `MAJOR.MINOR.PATCH`;
//! pre-release and build suffixes are deliberately not releases. The
//! calculator walks from HEAD towards the most recent release tag and picks
//! one bump with precedence breaking (`!`) > `feat` > everything else.

use crate::error::{Result, SlipwayError};
use git2::{Oid, Repository};
use regex::Regex;
use semver::Version;
use std::path::Path;
use std::sync::OnceLock;

static RELEASE_TAG_RE: OnceLock<Regex> = OnceLock::new();
static CONVENTIONAL_RE: OnceLock<Regex> = OnceLock::new();

/// Shared by the calculator and the head-release check; the two must never
/// disagree on what counts as a release.
fn release_tag_re() -> &'static Regex {
    RELEASE_TAG_RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap())
}

fn conventional_re() -> &'static Regex {
    CONVENTIONAL_RE.get_or_init(|| Regex::new(r"^(fix|feat|chore|docs|ci)(!?)(:|\s)").unwrap())
}

/// True if `name` is a release tag name.
pub fn is_release_tag(name: &str) -> bool {
    release_tag_re().is_match(name)
}

/// The release version tagged at HEAD, if any. Drives the pipeline's
/// should-process check: `Some` means the head commit is already released.
pub fn release_tag_at_head(worktree: &Path) -> Result<Option<Version>> {
    let repo = Repository::open(worktree)?;
    let head = repo.head()?.peel_to_commit()?.id();
    let mut tags = release_tags(&repo)?;
    Ok(tags
        .iter()
        .position(|(_, target)| *target == head)
        .map(|i| tags.swap_remove(i).0))
}

/// Compute the next version for the repository at `worktree`.
///
/// Walks commits from HEAD backwards. The first commit carrying a release
/// tag ends the walk and supplies the base version; every commit before it
/// must be a conventional commit or the calculation fails. With no release
/// tag anywhere in the history, the calculation fails.
pub fn next_version(worktree: &Path) -> Result<Version> {
    let repo = Repository::open(worktree)?;
    let tags = release_tags(&repo)?;

    let mut saw_breaking = false;
    let mut saw_feat = false;
    let mut saw_other = false;
    let mut base: Option<Version> = None;

    let mut walk = repo.revwalk()?;
    walk.push_head()?;
    for oid in walk {
        let oid = oid?;
        if let Some((version, _)) = tags.iter().find(|(_, target)| *target == oid) {
            base = Some(version.clone());
            break;
        }

        let commit = repo.find_commit(oid)?;
        let summary = commit.summary().unwrap_or("").to_string();
        let caps = conventional_re().captures(&summary).ok_or_else(|| {
            SlipwayError::NotConventionalCommit {
                hash: oid.to_string(),
                summary: summary.clone(),
            }
        })?;

        if &caps[2] == "!" {
            saw_breaking = true;
        } else if &caps[1] == "feat" {
            saw_feat = true;
        } else {
            saw_other = true;
        }
    }

    let base = base.ok_or(SlipwayError::NoReleaseTag)?;
    if saw_breaking {
        Ok(Version::new(base.major + 1, 0, 0))
    } else if saw_feat {
        Ok(Version::new(base.major, base.minor + 1, 0))
    } else if saw_other {
        Ok(Version::new(base.major, base.minor, base.patch + 1))
    } else {
        Err(SlipwayError::NothingToRelease(base.to_string()))
    }
}

/// All release tags resolved to commit hashes. Annotated tags peel to their
/// target; lightweight tags already point at the commit.
fn release_tags(repo: &Repository) -> Result<Vec<(Version, Oid)>> {
    let mut out = Vec::new();
    for name in repo.tag_names(None)?.iter().flatten() {
        if !is_release_tag(name) {
            continue;
        }
        let version = match Version::parse(name) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let reference = repo.find_reference(&format!("refs/tags/{name}"))?;
        let target = reference.peel_to_commit()?.id();
        out.push((version, target));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
