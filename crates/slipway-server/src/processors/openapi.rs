//! Client-package generation for OpenAPI services: one templater run per
//! configured target.

use crate::pipeline::ReleaseContext;
use semver::Version;
use slipway_core::service::{OpenApiConfig, ServiceRecord};

pub async fn build_and_deploy(
    ctx: &ReleaseContext,
    service: &ServiceRecord,
    cfg: &OpenApiConfig,
    version: &Version,
) -> anyhow::Result<()> {
    let spec_path = service.worktree_path.join(&cfg.spec_path);

    if let Some(target) = &cfg.typescript_client {
        ctx.templater
            .publish_typescript_client(&service.name, target.name.as_deref(), &spec_path, version)
            .await?;
    }

    if let Some(target) = &cfg.go_client {
        ctx.templater
            .publish_go_client(&service.name, target.name.as_deref(), &spec_path, version)
            .await?;
    }

    Ok(())
}
