//! Image build, push, and removal against the container daemon, plus the
//! CLI fallback for secret-bearing builds.

use crate::context;
use crate::error::BuilderError;
use crate::Result;
use bollard::image::{BuildImageOptions, PushImageOptions, RemoveImageOptions, TagImageOptions};
use bollard::auth::DockerCredentials;
use bollard::Docker;
use futures_util::StreamExt;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// RegistryAuth
// ---------------------------------------------------------------------------

/// Registry credentials presented on pushes. The token is a personal access
/// token, not a password.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub username: String,
    pub token: String,
    pub server: String,
}

// ---------------------------------------------------------------------------
// ImageBuilder
// ---------------------------------------------------------------------------

pub struct ImageBuilder {
    docker: Docker,
    artifact_prefix: String,
    auth: RegistryAuth,
    container_cli: PathBuf,
}

impl ImageBuilder {
    pub fn new(
        docker: Docker,
        artifact_prefix: String,
        auth: RegistryAuth,
        container_cli: PathBuf,
    ) -> Self {
        Self {
            docker,
            artifact_prefix,
            auth,
            container_cli,
        }
    }

    /// Connect to the daemon from the environment (honors `DOCKER_HOST`).
    pub fn connect() -> Result<Docker> {
        Ok(Docker::connect_with_local_defaults()?)
    }

    /// `<name>:<version>`, the local image tag.
    pub fn image_tag(name: &str, version: &Version) -> String {
        format!("{name}:{version}")
    }

    /// `<prefix>/<name>:<version>`, the remote registry-addressable tag.
    pub fn artifact_tag(&self, name: &str, version: &Version) -> String {
        format!("{}/{}", self.artifact_prefix, Self::image_tag(name, version))
    }

    /// Build `recipe_path` with `context_dir` as the build context via the
    /// daemon API, streaming engine output to stdout. Intermediate
    /// containers are removed even on failure.
    pub async fn build(&self, context_dir: &Path, recipe_path: &str, tags: &[String]) -> Result<()> {
        let (first, rest) = tags
            .split_first()
            .ok_or_else(|| BuilderError::Build("no tags provided".to_string()))?;

        let dir = context_dir.to_path_buf();
        let tarball = tokio::task::spawn_blocking(move || context::build_context_tar(&dir))
            .await
            .map_err(|e| BuilderError::Io(std::io::Error::other(e)))??;

        let options = BuildImageOptions {
            dockerfile: recipe_path.to_string(),
            t: first.clone(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(tarball.into()));
        while let Some(item) = stream.next().await {
            let update = item?;
            if let Some(line) = update.stream {
                print!("{line}");
            }
            if let Some(error) = update.error {
                return Err(BuilderError::Build(error));
            }
        }

        // The daemon build endpoint accepts a single tag; apply the rest.
        for tag in rest {
            let (repo, version) = split_tag(tag);
            self.docker
                .tag_image(
                    first,
                    Some(TagImageOptions {
                        repo: repo.to_string(),
                        tag: version.to_string(),
                    }),
                )
                .await?;
        }
        Ok(())
    }

    /// Build through the container CLI so build secrets can be mounted.
    ///
    /// Each secret is written to a 0600 file in a private temporary
    /// directory that is removed on every exit path.
    pub async fn build_with_secrets(
        &self,
        context_dir: &Path,
        recipe_path: &str,
        tags: &[String],
        secrets: &BTreeMap<String, Vec<u8>>,
    ) -> Result<()> {
        info!(
            context = %context_dir.display(),
            recipe = recipe_path,
            secret_count = secrets.len(),
            "building image with secrets via container CLI"
        );

        let secret_dir = tempfile::tempdir()?;
        let mut secret_files = BTreeMap::new();
        for (id, content) in secrets {
            let path = secret_dir.path().join(id);
            write_secret(&path, content)?;
            secret_files.insert(id.clone(), path);
        }

        let args = secret_build_args(context_dir, recipe_path, tags, &secret_files);
        debug!(?args, "container CLI build arguments");

        let status = Command::new(&self.container_cli)
            .args(&args)
            .status()
            .await?;

        if !status.success() {
            return Err(BuilderError::CommandFailed {
                program: self.container_cli.display().to_string(),
                code: status.code().unwrap_or(-1),
                output: String::new(),
            });
        }
        Ok(())
    }

    /// Push the artifact-tagged image for `service_name` at `version`,
    /// streaming progress into the log.
    pub async fn push(&self, service_name: &str, version: &Version) -> Result<()> {
        let remote = self.artifact_tag(service_name, version);
        let (image, tag) = split_tag(&remote);
        info!(service = service_name, image = %remote, "pushing image");

        let credentials = DockerCredentials {
            username: Some(self.auth.username.clone()),
            password: Some(self.auth.token.clone()),
            serveraddress: Some(self.auth.server.clone()),
            ..Default::default()
        };

        let mut stream = self.docker.push_image(
            image,
            Some(PushImageOptions {
                tag: tag.to_string(),
            }),
            Some(credentials),
        );
        while let Some(item) = stream.next().await {
            let update = item?;
            if let Some(error) = update.error {
                return Err(BuilderError::Build(error));
            }
            if let Some(status) = update.status {
                info!(service = service_name, progress = %status, "image push progress");
            }
        }

        info!(service = service_name, version = %version, "image push completed");
        Ok(())
    }

    /// Force-remove a local image by tag, pruning children.
    pub async fn remove(&self, tag: &str) -> Result<()> {
        self.docker
            .remove_image(
                tag,
                Some(RemoveImageOptions {
                    force: true,
                    noprune: false,
                }),
                None,
            )
            .await?;
        info!(tag, "local image removed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn split_tag(full: &str) -> (&str, &str) {
    match full.rsplit_once(':') {
        Some((image, tag)) => (image, tag),
        None => (full, "latest"),
    }
}

#[cfg(unix)]
fn write_secret(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content)?;
    Ok(())
}

/// Argument list for `docker build` with secret mounts:
/// `build --secret id=…,src=… -t tag… -f <ctx>/<recipe> <ctx>`.
fn secret_build_args(
    context_dir: &Path,
    recipe_path: &str,
    tags: &[String],
    secret_files: &BTreeMap<String, PathBuf>,
) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    for (id, path) in secret_files {
        args.push("--secret".to_string());
        args.push(format!("id={id},src={}", path.display()));
    }
    for tag in tags {
        args.push("-t".to_string());
        args.push(tag.clone());
    }
    args.push("-f".to_string());
    args.push(context_dir.join(recipe_path).display().to_string());
    args.push(context_dir.display().to_string());
    args
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tag_formats() {
        let v = Version::new(1, 2, 3);
        assert_eq!(ImageBuilder::image_tag("billing-api", &v), "billing-api:1.2.3");
    }

    #[test]
    fn artifact_tag_is_prefix_name_version() {
        // Building the client is configuration only; no daemon round-trip.
        let docker = ImageBuilder::connect().unwrap();
        let builder = ImageBuilder::new(
            docker,
            "registry.local/team".to_string(),
            RegistryAuth {
                username: "ci".into(),
                token: "pat".into(),
                server: "registry.local".into(),
            },
            PathBuf::from("/usr/bin/docker"),
        );
        assert_eq!(
            builder.artifact_tag("billing-api", &Version::new(1, 2, 3)),
            "registry.local/team/billing-api:1.2.3"
        );
    }

    #[test]
    fn split_tag_handles_registry_ports() {
        assert_eq!(split_tag("billing-api:1.2.3"), ("billing-api", "1.2.3"));
        assert_eq!(
            split_tag("registry.local:5000/team/billing-api:1.2.3"),
            ("registry.local:5000/team/billing-api", "1.2.3")
        );
        assert_eq!(split_tag("plain"), ("plain", "latest"));
    }

    #[test]
    fn secret_build_args_shape() {
        let ctx = Path::new("/work/ctx");
        let secrets = BTreeMap::from([
            ("npmrc".to_string(), PathBuf::from("/tmp/s/npmrc")),
        ]);
        let tags = vec!["svc:1.0.0".to_string(), "reg/svc:1.0.0".to_string()];

        let args = secret_build_args(ctx, "Dockerfile", &tags, &secrets);
        assert_eq!(
            args,
            vec![
                "build",
                "--secret",
                "id=npmrc,src=/tmp/s/npmrc",
                "-t",
                "svc:1.0.0",
                "-t",
                "reg/svc:1.0.0",
                "-f",
                "/work/ctx/Dockerfile",
                "/work/ctx",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn secrets_are_written_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("npmrc");
        write_secret(&path, b"//registry:_authToken=abc").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"//registry:_authToken=abc");
    }

    #[cfg(unix)]
    #[test]
    fn secret_write_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("npmrc");
        write_secret(&path, b"one").unwrap();
        assert!(write_secret(&path, b"two").is_err());
    }
}
