use crate::error::{Result, SlipwayError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Catalog layout constants
// ---------------------------------------------------------------------------

/// Per-service descriptor file inside `<root>/<name>/`.
pub const SERVICE_DEFINITION_FILE: &str = "service_definition.json";

/// Subdirectory of `<root>/<name>/` holding the cloned working tree.
pub const REPO_DIR: &str = "repo";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn service_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

pub fn service_definition(root: &Path, name: &str) -> PathBuf {
    service_dir(root, name).join(SERVICE_DEFINITION_FILE)
}

/// The working tree path is always derived from the layout, never persisted.
pub fn worktree_dir(root: &Path, name: &str) -> PathBuf {
    service_dir(root, name).join(REPO_DIR)
}

// ---------------------------------------------------------------------------
// Service name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Service names double as directory names under the catalog root, so they
/// are restricted to lowercase alphanumerics and interior hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(SlipwayError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["billing-api", "a", "svc-2", "x1"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in [
            "",
            "-leading",
            "trailing-",
            "has space",
            "UPPER",
            "under_score",
            "../escape",
        ] {
            assert!(validate_name(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn layout_helpers() {
        let root = Path::new("/var/lib/slipway");
        assert_eq!(
            service_definition(root, "billing-api"),
            PathBuf::from("/var/lib/slipway/billing-api/service_definition.json")
        );
        assert_eq!(
            worktree_dir(root, "billing-api"),
            PathBuf::from("/var/lib/slipway/billing-api/repo")
        );
    }
}
