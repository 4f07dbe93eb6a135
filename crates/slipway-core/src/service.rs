use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ServiceRecord
// ---------------------------------------------------------------------------

/// A registered service: immutable identity plus release configuration.
///
/// Persisted as `service_definition.json` under the catalog root. The
/// working tree path is derived from the catalog layout on every load and
/// never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub git_ssh_url: String,
    pub branch_name: String,
    pub configuration: ServiceConfiguration,
    #[serde(skip)]
    pub worktree_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Configuration variants
// ---------------------------------------------------------------------------

/// Exactly one variant is populated per service. The externally tagged JSON
/// representation enforces this on load; intake enforces it on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceConfiguration {
    NpmService(NpmServiceConfig),
    Openapi(OpenApiConfig),
}

impl ServiceConfiguration {
    /// Stable variant name for logs and dispatch.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceConfiguration::NpmService(_) => "npm_service",
            ServiceConfiguration::Openapi(_) => "openapi",
        }
    }
}

/// A deployable npm service: container image build plus compose rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpmServiceConfig {
    /// Env file name written into the working tree before compose up.
    pub env_path: String,
    /// Container recipe path, relative to the working tree.
    pub containerfile_path: String,
    /// Directory holding the compose file, relative to the working tree.
    pub compose_path: String,
    #[serde(default)]
    pub env_vars: BTreeMap<String, serde_json::Value>,
}

/// An OpenAPI document from which client packages are generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiConfig {
    /// Spec YAML path, relative to the working tree.
    pub spec_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typescript_client: Option<ClientTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_client: Option<ClientTarget>,
}

/// A client package target. An absent name falls back to
/// `<service>-<language>-client`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
