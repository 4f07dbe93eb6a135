use crate::error::{Result, SlipwayError};
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Controller configuration, read once from the environment at startup.
/// A missing required variable terminates startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Catalog root directory (`SERVICE_FILE_PATH`).
    pub catalog_root: PathBuf,
    /// SSH private key used for every git operation (`SSH_KEY_PATH`).
    pub ssh_key_path: PathBuf,
    /// Git remote name, e.g. `origin` (`GIT_REPO_ORIGIN`).
    pub git_remote: String,
    /// CI commit/tag author (`CI_COMMIT_AUTHOR_NAME` / `_EMAIL`).
    pub ci_author_name: String,
    pub ci_author_email: String,
    /// Registry path component prepended to image names (`ARTIFACT_PREFIX`).
    pub artifact_prefix: String,
    /// Container registry credentials (`DOCKER_SERVER` / `DOCKER_USERNAME` /
    /// `DOCKER_PAT`).
    pub registry_server: String,
    pub registry_username: String,
    pub registry_token: String,
    /// npm scope for generated TypeScript clients (`NPM_PACKAGE_SCOPE`).
    pub npm_scope: String,
    /// npm registry the generated clients publish to (`NPM_REGISTRY_URL`).
    pub npm_registry_url: String,
    /// Credentials file fed to secret-bearing builds (`NPMRC_PATH`).
    pub npmrc_path: PathBuf,
    /// Base path for generated Go modules (`GO_MODULE_BASE_PATH`).
    pub go_module_base: String,
    /// Module registry the Go client recipe authenticates with
    /// (`ARTIFACT_REGISTRY_URL` / `ARTIFACT_PAT`).
    pub go_registry_url: String,
    pub go_registry_token: String,
    /// Container CLI used for secret-bearing builds (`PATH_TO_DOCKER_CLI`).
    pub container_cli: PathBuf,
    /// Compose CLI flavor (`COMPOSE_CLI_VERSION`: `v1` | `v2`).
    pub compose_cli: ComposeCliVersion,
    /// Reconciliation period (`BACKGROUND_PROCESSING_INTERVAL`, e.g. `30s`).
    pub processing_interval: Duration,
    /// Control-plane API key (`API_KEY`).
    pub api_key: String,
    /// Listen port (`PORT`, default 5000).
    pub port: u16,
    /// Dev mode: debug logging to stdout only (`IS_DEV`).
    pub dev_mode: bool,
    /// Directory for the combined log file outside dev mode (`LOGGING_DIR`).
    pub logging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCliVersion {
    V1,
    V2,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let dev_mode = optional("IS_DEV")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let compose_cli = match optional("COMPOSE_CLI_VERSION").as_deref() {
            None | Some("v2") => ComposeCliVersion::V2,
            Some("v1") => ComposeCliVersion::V1,
            Some(other) => {
                return Err(SlipwayError::InvalidEnvVar {
                    name: "COMPOSE_CLI_VERSION".into(),
                    reason: format!("expected v1 or v2, got {other}"),
                })
            }
        };

        let port = match optional("PORT") {
            None => 5000,
            Some(raw) => raw.parse::<u16>().map_err(|e| SlipwayError::InvalidEnvVar {
                name: "PORT".into(),
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            catalog_root: PathBuf::from(required("SERVICE_FILE_PATH")?),
            ssh_key_path: PathBuf::from(required("SSH_KEY_PATH")?),
            git_remote: required("GIT_REPO_ORIGIN")?,
            ci_author_name: required("CI_COMMIT_AUTHOR_NAME")?,
            ci_author_email: required("CI_COMMIT_AUTHOR_EMAIL")?,
            artifact_prefix: required("ARTIFACT_PREFIX")?,
            registry_server: required("DOCKER_SERVER")?,
            registry_username: required("DOCKER_USERNAME")?,
            registry_token: required("DOCKER_PAT")?,
            npm_scope: required("NPM_PACKAGE_SCOPE")?,
            npm_registry_url: required("NPM_REGISTRY_URL")?,
            npmrc_path: PathBuf::from(required("NPMRC_PATH")?),
            go_module_base: required("GO_MODULE_BASE_PATH")?,
            go_registry_url: required("ARTIFACT_REGISTRY_URL")?,
            go_registry_token: required("ARTIFACT_PAT")?,
            container_cli: PathBuf::from(
                optional("PATH_TO_DOCKER_CLI").unwrap_or_else(|| "/usr/bin/docker".to_string()),
            ),
            compose_cli,
            processing_interval: parse_duration(&required("BACKGROUND_PROCESSING_INTERVAL")?)
                .map_err(|reason| SlipwayError::InvalidEnvVar {
                    name: "BACKGROUND_PROCESSING_INTERVAL".into(),
                    reason,
                })?,
            api_key: required("API_KEY")?,
            port,
            dev_mode,
            logging_dir: optional("LOGGING_DIR").map(PathBuf::from),
        })
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(SlipwayError::MissingEnvVar(name.to_string())),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Duration parsing
// ---------------------------------------------------------------------------

/// Parse `<integer><unit>` durations with units `ms`, `s`, `m`, `h`.
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in '{raw}'"))?;
    let (num, unit) = raw.split_at(split);
    let value: u64 = num.parse().map_err(|_| format!("invalid number in '{raw}'"))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        other => Err(format!("unknown unit '{other}' in '{raw}'")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
