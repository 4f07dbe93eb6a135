//! Filesystem-backed catalog of registered services.
//!
//! Layout per service:
//! ```text
//! <root>/<name>/service_definition.json   identity + configuration
//! <root>/<name>/repo/                      single-branch clone
//! ```
//! This process is the only writer under `<root>`.

use crate::error::{Result, SlipwayError};
use crate::gitops::{self, SshKey};
use crate::io;
use crate::paths;
use crate::service::ServiceRecord;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    remote_name: String,
    ssh_key: SshKey,
}

impl Catalog {
    /// Open the catalog at `root`. The root must already exist; a missing
    /// or non-directory root is a startup-fatal misconfiguration.
    pub fn open(root: &Path, remote_name: &str, ssh_key: SshKey) -> Result<Self> {
        if !io::is_dir(root) {
            return Err(SlipwayError::InvalidCatalogRoot(
                root.display().to_string(),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
            remote_name: remote_name.to_string(),
            ssh_key,
        })
    }

    /// Persist a new service: write the descriptor, then clone its
    /// repository. Any failure after the directory is created removes the
    /// whole `<root>/<name>/` tree so no partial record survives.
    pub fn create(&self, record: &mut ServiceRecord) -> Result<()> {
        let dir = paths::service_dir(&self.root, &record.name);
        if dir.exists() {
            return Err(SlipwayError::ServiceExists(record.name.clone()));
        }
        io::ensure_dir(&dir)?;

        if let Err(e) = self.populate(record) {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }

        info!(service = %record.name, "service registered");
        Ok(())
    }

    fn populate(&self, record: &mut ServiceRecord) -> Result<()> {
        let descriptor = serde_json::to_vec_pretty(record)?;
        io::atomic_write(&paths::service_definition(&self.root, &record.name), &descriptor)?;

        let worktree = paths::worktree_dir(&self.root, &record.name);
        io::ensure_dir(&worktree)?;
        record.worktree_path = worktree.clone();

        gitops::clone(
            &record.git_ssh_url,
            &record.branch_name,
            &worktree,
            &self.remote_name,
            &self.ssh_key,
        )
    }

    /// Load one service by name. A missing directory is NotFound; a
    /// descriptor that fails to parse propagates as-is.
    pub fn get(&self, name: &str) -> Result<ServiceRecord> {
        let dir = paths::service_dir(&self.root, name);
        if !io::is_dir(&dir) {
            return Err(SlipwayError::ServiceNotFound(name.to_string()));
        }
        let data = std::fs::read_to_string(paths::service_definition(&self.root, name))?;
        let mut record: ServiceRecord = serde_json::from_str(&data)?;
        record.worktree_path = paths::worktree_dir(&self.root, name);
        Ok(record)
    }

    /// List up to `max_results` services ordered by name.
    ///
    /// Pagination is a cursor over the sorted names: pass the last name of
    /// the previous page as `next_token` (empty string for the first page).
    pub fn list(&self, max_results: usize, next_token: &str) -> Result<Vec<ServiceRecord>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut services = Vec::new();
        for name in names {
            if !next_token.is_empty() && name.as_str() <= next_token {
                continue;
            }
            services.push(self.get(&name)?);
            if services.len() >= max_results {
                break;
            }
        }
        Ok(services)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
