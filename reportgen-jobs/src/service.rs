//! Collaborator seams: the remote job service and the brand source.

use std::path::PathBuf;

use async_trait::async_trait;

use reportgen_core::config::load_brand_profile;
use reportgen_core::{BrandProfile, ErrorDetail, GenerationRequest, GenerationResult, JobId};

use crate::error::ServiceError;

/// Answer to one status request.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Succeeded(GenerationResult),
    Failed(ErrorDetail),
}

/// Remote report-generation service.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Start a job. `Rejected` carries the service's own explanation.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, ServiceError>;

    async fn status(&self, job_id: &JobId) -> Result<JobStatus, ServiceError>;
}

/// Where the account's brand profile comes from.
#[async_trait]
pub trait BrandSource: Send + Sync {
    async fn brand(&self) -> Result<BrandProfile, ServiceError>;
}

/// A fixed profile, e.g. from the command line or a test.
#[derive(Debug, Clone, Default)]
pub struct StaticBrand(pub BrandProfile);

#[async_trait]
impl BrandSource for StaticBrand {
    async fn brand(&self) -> Result<BrandProfile, ServiceError> {
        Ok(self.0.clone())
    }
}

/// Profile read from a local YAML file on every call.
#[derive(Debug, Clone)]
pub struct FileBrandSource {
    path: PathBuf,
}

impl FileBrandSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BrandSource for FileBrandSource {
    async fn brand(&self) -> Result<BrandProfile, ServiceError> {
        let path = self.path.clone();
        let profile = tokio::task::spawn_blocking(move || load_brand_profile(&path))
            .await
            .map_err(|err| ServiceError::Protocol(format!("brand load task failed: {err}")))??;
        Ok(profile)
    }
}
