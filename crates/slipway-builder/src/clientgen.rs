//! OpenAPI client-package scaffolding and publication.
//!
//! For each enabled client target the templater materializes an ephemeral
//! build directory from embedded templates, copies the spec in, and drives
//! a secret-bearing image build whose recipe performs the codegen and
//! publishes the package. The build directory and the produced local image
//! are removed on every exit path.

use crate::image::ImageBuilder;
use crate::Result;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const NPMRC_SECRET: &str = "npmrc";
const GITEA_TOKEN_SECRET: &str = "gitea_token";

const TS_PACKAGE_JSON: &str = include_str!("templates/typescript/package.json.tmpl");
const TS_CODEGEN_CONFIG: &str = include_str!("templates/typescript/openapi-ts.config.ts.tmpl");
const TS_PRETTIERRC: &str = include_str!("templates/typescript/prettierrc.json");
const TS_DOCKERFILE: &str = include_str!("templates/typescript/Dockerfile.typescript-client");

const GO_MOD: &str = include_str!("templates/go/go.mod.tmpl");
const GO_CODEGEN_CONFIG: &str = include_str!("templates/go/oapi-codegen.yaml.tmpl");
const GO_DOCKERFILE: &str = include_str!("templates/go/Dockerfile.go-client");

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TypescriptClientConfig {
    /// Scope for generated packages, e.g. `acme` for `@acme/foo-client`.
    pub npm_scope: String,
    /// npm registry the recipe publishes to.
    pub registry_url: String,
    /// Credentials file fed to the build as the `npmrc` secret.
    pub npmrc_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GoClientConfig {
    /// Module path prefix, e.g. `forge.local/clients`.
    pub module_base: String,
    /// Module registry base URL the recipe uploads to.
    pub registry_url: String,
    /// Token fed to the build as the `gitea_token` secret.
    pub token: String,
}

// ---------------------------------------------------------------------------
// ClientTemplater
// ---------------------------------------------------------------------------

pub struct ClientTemplater {
    builder: Arc<ImageBuilder>,
    typescript: TypescriptClientConfig,
    go: GoClientConfig,
}

impl ClientTemplater {
    pub fn new(
        builder: Arc<ImageBuilder>,
        typescript: TypescriptClientConfig,
        go: GoClientConfig,
    ) -> Self {
        Self {
            builder,
            typescript,
            go,
        }
    }

    /// Generate and publish the TypeScript client for `service_name`.
    pub async fn publish_typescript_client(
        &self,
        service_name: &str,
        client_name: Option<&str>,
        spec_path: &Path,
        version: &Version,
    ) -> Result<()> {
        let client = typescript_client_name(service_name, client_name);
        info!(service = service_name, client, version = %version, "publishing TypeScript client");

        let build_dir = create_build_dir("typescript", service_name)?;
        let image = format!("{service_name}-openapi-typescript-client-builder");
        let tag = ImageBuilder::image_tag(&image, version);

        let result = self
            .typescript_build(&build_dir, &client, spec_path, version, &tag)
            .await;
        self.cleanup(&build_dir, &tag).await;
        result?;

        info!(service = service_name, client, "TypeScript client published");
        Ok(())
    }

    async fn typescript_build(
        &self,
        build_dir: &Path,
        client: &str,
        spec_path: &Path,
        version: &Version,
        tag: &str,
    ) -> Result<()> {
        let spec_file = spec_file_name(spec_path);
        let package_name = format!("@{}/{}", self.typescript.npm_scope, client);
        let output_path = format!("./lib/{client}");
        let version_str = version.to_string();
        let description = format!("TypeScript SDK for {client}");
        let vars = [
            ("package_name", package_name.as_str()),
            ("version", version_str.as_str()),
            ("description", description.as_str()),
            ("spec_file", spec_file.as_str()),
            ("output_path", output_path.as_str()),
            ("registry_url", self.typescript.registry_url.as_str()),
        ];

        std::fs::write(build_dir.join("package.json"), render(TS_PACKAGE_JSON, &vars))?;
        std::fs::write(
            build_dir.join("openapi-ts.config.ts"),
            render(TS_CODEGEN_CONFIG, &vars),
        )?;
        std::fs::write(build_dir.join(".prettierrc.json"), TS_PRETTIERRC)?;
        std::fs::write(build_dir.join("Dockerfile"), TS_DOCKERFILE)?;
        std::fs::copy(spec_path, build_dir.join(&spec_file))?;

        let npmrc = std::fs::read(&self.typescript.npmrc_path)?;
        let secrets = BTreeMap::from([(NPMRC_SECRET.to_string(), npmrc)]);
        self.builder
            .build_with_secrets(build_dir, "Dockerfile", &[tag.to_string()], &secrets)
            .await
    }

    /// Generate and publish the Go client module for `service_name`.
    pub async fn publish_go_client(
        &self,
        service_name: &str,
        client_name: Option<&str>,
        spec_path: &Path,
        version: &Version,
    ) -> Result<()> {
        let client = go_client_name(service_name, client_name);
        info!(service = service_name, client, version = %version, "publishing Go client");

        let build_dir = create_build_dir("go", service_name)?;
        let image = format!("{service_name}-openapi-go-client-builder");
        let tag = ImageBuilder::image_tag(&image, version);

        let result = self
            .go_build(&build_dir, &client, spec_path, version, &tag)
            .await;
        self.cleanup(&build_dir, &tag).await;
        result?;

        info!(service = service_name, client, "Go client published");
        Ok(())
    }

    async fn go_build(
        &self,
        build_dir: &Path,
        client: &str,
        spec_path: &Path,
        version: &Version,
        tag: &str,
    ) -> Result<()> {
        let spec_file = spec_file_name(spec_path);
        let module_path = format!("{}/{}", self.go.module_base, client);
        let version_str = go_module_version(version);
        let vars = [
            ("module_path", module_path.as_str()),
            ("package_name", client),
            ("version", version_str.as_str()),
            ("spec_file", spec_file.as_str()),
            ("output_path", "./lib"),
            ("registry_url", self.go.registry_url.as_str()),
        ];

        std::fs::write(build_dir.join("go.mod"), render(GO_MOD, &vars))?;
        std::fs::write(build_dir.join("config.yaml"), render(GO_CODEGEN_CONFIG, &vars))?;
        std::fs::write(build_dir.join("Dockerfile"), render(GO_DOCKERFILE, &vars))?;
        std::fs::copy(spec_path, build_dir.join(&spec_file))?;

        let secrets = BTreeMap::from([(
            GITEA_TOKEN_SECRET.to_string(),
            self.go.token.clone().into_bytes(),
        )]);
        self.builder
            .build_with_secrets(build_dir, "Dockerfile", &[tag.to_string()], &secrets)
            .await
    }

    /// Best-effort teardown; failures are logged, never propagated.
    async fn cleanup(&self, build_dir: &Path, tag: &str) {
        if let Err(e) = std::fs::remove_dir_all(build_dir) {
            warn!(dir = %build_dir.display(), error = %e, "failed to remove client build directory");
        }
        if let Err(e) = self.builder.remove(tag).await {
            warn!(tag, error = %e, "failed to remove client builder image");
        }
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

fn typescript_client_name(service_name: &str, configured: Option<&str>) -> String {
    match configured {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{service_name}-typescript-client"),
    }
}

/// Go package identifiers cannot contain hyphens.
fn go_client_name(service_name: &str, configured: Option<&str>) -> String {
    let name = match configured {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{service_name}-go-client"),
    };
    name.replace('-', "_")
}

/// Go module versions carry a `v` prefix.
fn go_module_version(version: &Version) -> String {
    format!("v{version}")
}

fn spec_file_name(spec_path: &Path) -> String {
    spec_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "openapi.yaml".to_string())
}

fn create_build_dir(target: &str, service_name: &str) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    let dir = std::env::temp_dir().join(format!(
        "openapi-client-build-{target}-{service_name}-{stamp}"
    ));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
