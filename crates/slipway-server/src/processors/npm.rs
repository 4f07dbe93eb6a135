//! Artifact build and rollout for deployable npm services: image build,
//! registry push, env file, compose up.

use crate::pipeline::ReleaseContext;
use semver::Version;
use slipway_builder::ImageBuilder;
use slipway_core::envfile;
use slipway_core::service::{NpmServiceConfig, ServiceRecord};
use tracing::info;

pub async fn build_and_deploy(
    ctx: &ReleaseContext,
    service: &ServiceRecord,
    cfg: &NpmServiceConfig,
    version: &Version,
) -> anyhow::Result<()> {
    info!(service = %service.name, version = %version, "building image");
    let tags = vec![
        ImageBuilder::image_tag(&service.name, version),
        ctx.builder.artifact_tag(&service.name, version),
    ];
    ctx.builder
        .build(&service.worktree_path, &cfg.containerfile_path, &tags)
        .await?;

    ctx.builder.push(&service.name, version).await?;

    info!(service = %service.name, version = %version, "writing env vars");
    envfile::write(&service.worktree_path, &cfg.env_path, &cfg.env_vars)?;

    info!(service = %service.name, version = %version, "starting service");
    let compose_dir = service.worktree_path.join(&cfg.compose_path);
    ctx.compose.up(&compose_dir, version).await?;

    Ok(())
}
