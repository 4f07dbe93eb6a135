//! Service intake: validate a creation payload, persist it durably, then
//! hand the new service to the supervisor over the admission channel.

use crate::catalog::Catalog;
use crate::error::{Result, SlipwayError};
use crate::paths;
use crate::service::{NpmServiceConfig, OpenApiConfig, ServiceConfiguration, ServiceRecord};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Admission tokens are service pointers; the supervisor consumes one per
/// reconciliation task it starts.
pub type AdmissionSender = mpsc::Sender<Arc<ServiceRecord>>;
pub type AdmissionReceiver = mpsc::Receiver<Arc<ServiceRecord>>;

/// Bounded FIFO between intake/startup enumeration and the supervisor.
/// Intake blocks when the queue is full; a create succeeds only after its
/// token is enqueued.
pub const ADMISSION_CAPACITY: usize = 100;

pub fn admission_channel() -> (AdmissionSender, AdmissionReceiver) {
    mpsc::channel(ADMISSION_CAPACITY)
}

// ---------------------------------------------------------------------------
// Create request
// ---------------------------------------------------------------------------

/// Caller-supplied creation payload. Exactly one of the configuration
/// bodies must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub git_ssh_url: String,
    pub branch_name: String,
    #[serde(default)]
    pub npm_service: Option<NpmServiceConfig>,
    #[serde(default)]
    pub openapi: Option<OpenApiConfig>,
}

impl CreateServiceRequest {
    fn into_configuration(self) -> Result<ServiceConfiguration> {
        match (self.npm_service, self.openapi) {
            (Some(npm), None) => Ok(ServiceConfiguration::NpmService(npm)),
            (None, Some(openapi)) => Ok(ServiceConfiguration::Openapi(openapi)),
            (None, None) => Err(SlipwayError::InvalidConfiguration(
                "no configuration variant provided".to_string(),
            )),
            (Some(_), Some(_)) => Err(SlipwayError::InvalidConfiguration(
                "more than one configuration variant provided".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

pub struct Intake {
    catalog: Arc<Catalog>,
    admission: AdmissionSender,
}

impl Intake {
    pub fn new(catalog: Arc<Catalog>, admission: AdmissionSender) -> Self {
        Self { catalog, admission }
    }

    /// Validate, persist, and admit a new service.
    ///
    /// The conflict check runs before any disk write; the admission token is
    /// sent only after the record (and its clone) are durable, so the
    /// supervisor never sees a service that could still be rolled back.
    pub async fn create(&self, request: CreateServiceRequest) -> Result<ServiceRecord> {
        let catalog = Arc::clone(&self.catalog);
        let record = tokio::task::spawn_blocking(move || -> Result<ServiceRecord> {
            paths::validate_name(&request.name)?;

            match catalog.get(&request.name) {
                Ok(_) => return Err(SlipwayError::ServiceExists(request.name.clone())),
                Err(SlipwayError::ServiceNotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let mut record = ServiceRecord {
                id: ulid::Ulid::new().to_string(),
                name: request.name.clone(),
                git_ssh_url: request.git_ssh_url.clone(),
                branch_name: request.branch_name.clone(),
                configuration: request.into_configuration()?,
                worktree_path: PathBuf::new(),
            };
            catalog.create(&mut record)?;
            Ok(record)
        })
        .await
        .map_err(|e| SlipwayError::Io(std::io::Error::other(e)))??;

        self.admission
            .send(Arc::new(record.clone()))
            .await
            .map_err(|_| SlipwayError::AdmissionClosed)?;
        Ok(record)
    }

    pub fn get(&self, name: &str) -> Result<ServiceRecord> {
        self.catalog.get(name)
    }

    pub fn list(&self, max_results: usize, next_token: &str) -> Result<Vec<ServiceRecord>> {
        self.catalog.list(max_results, next_token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
