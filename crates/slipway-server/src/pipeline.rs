//! The per-service reconciliation pipeline.
//!
//! One pass per tick:
//!   sync → should-process? → next version → mutate versioned files →
//!   commit+push → tag+push → build & publish → deploy.
//!
//! Steps through the tag push are synchronous git/filesystem work and run
//! on the blocking pool; artifact builds and compose rollout are async. A
//! failing step aborts the pass with no compensation; the next tick
//! retries from the top, and the git steps are idempotent (pushes accept
//! up-to-date, the release tag is only re-created at the same commit).

use crate::processors;
use semver::Version;
use slipway_builder::{ClientTemplater, Compose, ImageBuilder};
use slipway_core::gitops::{self, CommitAuthor, SshKey};
use slipway_core::service::{ServiceConfiguration, ServiceRecord};
use slipway_core::{manifest, openapi_doc, version, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a reconciliation pass needs beyond the service record itself.
pub struct ReleaseContext {
    pub remote_name: String,
    pub ssh_key: SshKey,
    pub author: CommitAuthor,
    pub builder: Arc<ImageBuilder>,
    pub compose: Arc<Compose>,
    pub templater: Arc<ClientTemplater>,
}

/// Run one full reconciliation pass for `service`.
pub async fn reconcile(ctx: &Arc<ReleaseContext>, service: &Arc<ServiceRecord>) -> anyhow::Result<()> {
    let git_ctx = Arc::clone(ctx);
    let git_service = Arc::clone(service);
    let next = tokio::task::spawn_blocking(move || {
        prepare_release(&git_service, &git_ctx.remote_name, &git_ctx.ssh_key, &git_ctx.author)
    })
    .await??;

    let Some(next) = next else {
        debug!(service = %service.name, "head already released, nothing to do");
        return Ok(());
    };

    info!(service = %service.name, version = %next, kind = service.configuration.kind(), "releasing");
    match &service.configuration {
        ServiceConfiguration::NpmService(cfg) => {
            processors::npm::build_and_deploy(ctx, service, cfg, &next).await?;
        }
        ServiceConfiguration::Openapi(cfg) => {
            processors::openapi::build_and_deploy(ctx, service, cfg, &next).await?;
        }
    }

    info!(service = %service.name, version = %next, "release complete");
    Ok(())
}

/// Steps 1–6: sync the working tree, decide whether work is needed, compute
/// the next version, rewrite version metadata, then commit, tag, and push.
///
/// Returns `None` when HEAD already carries a release tag, in which case
/// nothing was written anywhere.
pub fn prepare_release(
    service: &ServiceRecord,
    remote_name: &str,
    ssh_key: &SshKey,
    author: &CommitAuthor,
) -> Result<Option<Version>> {
    let worktree = service.worktree_path.as_path();

    gitops::pull(worktree, &service.branch_name, remote_name, ssh_key)?;

    if let Some(released) = version::release_tag_at_head(worktree)? {
        debug!(service = %service.name, version = %released, "head commit already released");
        return Ok(None);
    }

    let next = version::next_version(worktree)?;

    match &service.configuration {
        ServiceConfiguration::NpmService(_) => {
            manifest::set_package_version(worktree, &next)?;
        }
        ServiceConfiguration::Openapi(cfg) => {
            openapi_doc::set_info_version(&worktree.join(&cfg.spec_path), &next)?;
        }
    }

    gitops::commit_all(worktree, &format!("ci: Release version {next}"), author)?;
    gitops::push_branch(worktree, &service.branch_name, remote_name, ssh_key)?;

    gitops::create_tag(worktree, &next.to_string(), &format!("Release {next}"), author)?;
    gitops::push_tags(worktree, remote_name, ssh_key)?;

    Ok(Some(next))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
