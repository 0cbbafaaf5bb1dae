//! HTTP collaborators for the report service.
//!
//! ```text
//! POST {base}/v1/reports            -> 2xx {"job_id": "..."}
//!                                      4xx/5xx {"error": {"message": "...", "code": "..."}}
//! GET  {base}/v1/reports/{job_id}   -> {"status": "running"}
//!                                      {"status": "succeeded", "result": {...}}
//!                                      {"status": "failed", "error": {...}}
//! GET  {base}/v1/account/brand      -> BrandProfile
//! ```
//!
//! A configured API key is sent as a bearer token on every request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use reportgen_core::config::ServiceSettings;
use reportgen_core::{BrandProfile, ErrorDetail, GenerationRequest, GenerationResult, JobId};

use crate::error::ServiceError;
use crate::service::{BrandSource, JobService, JobStatus};

const USER_AGENT: &str = concat!("reportgen/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Accepted {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StatusBody {
    #[serde(alias = "pending", alias = "queued")]
    Running,
    Succeeded {
        result: GenerationResult,
    },
    Failed {
        #[serde(default)]
        error: Option<ErrorDetail>,
    },
}

// ---------------------------------------------------------------------------
// Shared client plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Endpoint {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl Endpoint {
    fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ServiceError::Protocol(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Protocol(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            api_key: api_key.map(str::to_owned),
            base_url,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        self.authorize(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, ServiceError> {
    let body = response
        .text()
        .await
        .map_err(|e| ServiceError::Transport(e.to_string()))?;
    serde_json::from_str(&body)
        .map_err(|e| ServiceError::Protocol(format!("{context}: unexpected body: {e}")))
}

// ---------------------------------------------------------------------------
// HttpJobService
// ---------------------------------------------------------------------------

/// [`JobService`] over the report service's REST API.
#[derive(Debug, Clone)]
pub struct HttpJobService {
    endpoint: Endpoint,
}

impl HttpJobService {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        Self::with_base_url(
            &settings.base_url,
            settings.api_key.as_deref(),
            settings.request_timeout_secs,
        )
    }

    /// Client against an explicit base URL, e.g. a mock server.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, api_key, Duration::from_secs(timeout_secs))?,
        })
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, ServiceError> {
        let url = self.endpoint.url(&["v1", "reports"]);
        let response = self
            .endpoint
            .send(self.endpoint.client.post(url).json(request))
            .await?;

        let status = response.status();
        if status.is_success() {
            let accepted: Accepted = read_json(response, "submit").await?;
            return Ok(accepted.job_id);
        }

        if is_retryable(status) && !status.is_server_error() {
            return Err(ServiceError::Transport(format!("submit failed with HTTP {status}")));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(ServiceError::Rejected(envelope.error)),
            Err(_) if status.is_server_error() => {
                Err(ServiceError::Transport(format!("submit failed with HTTP {status}")))
            }
            Err(_) => Err(ServiceError::Rejected(ErrorDetail::new(format!(
                "The report service refused the request (HTTP {}).",
                status.as_u16()
            )))),
        }
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatus, ServiceError> {
        let url = self.endpoint.url(&["v1", "reports", &job_id.0]);
        let response = self.endpoint.send(self.endpoint.client.get(url)).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::Protocol(format!(
                "job {job_id} is unknown to the report service"
            )));
        }
        if is_retryable(status) {
            return Err(ServiceError::Transport(format!(
                "status check failed with HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(ServiceError::Protocol(format!(
                "status check failed with HTTP {status}"
            )));
        }

        Ok(match read_json(response, "status").await? {
            StatusBody::Running => JobStatus::Running,
            StatusBody::Succeeded { result } => JobStatus::Succeeded(result),
            StatusBody::Failed { error } => {
                JobStatus::Failed(error.unwrap_or_else(|| ErrorDetail::new("")))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// HttpBrandSource
// ---------------------------------------------------------------------------

/// [`BrandSource`] reading the signed-in account's brand profile.
///
/// An account without a profile (404) gets [`BrandProfile::default`].
#[derive(Debug, Clone)]
pub struct HttpBrandSource {
    endpoint: Endpoint,
}

impl HttpBrandSource {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        Self::with_base_url(
            &settings.base_url,
            settings.api_key.as_deref(),
            settings.request_timeout_secs,
        )
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, api_key, Duration::from_secs(timeout_secs))?,
        })
    }
}

#[async_trait]
impl BrandSource for HttpBrandSource {
    async fn brand(&self) -> Result<BrandProfile, ServiceError> {
        let url = self.endpoint.url(&["v1", "account", "brand"]);
        let response = self.endpoint.send(self.endpoint.client.get(url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(BrandProfile::default()),
            s if s.is_success() => read_json(response, "brand").await,
            s if is_retryable(s) => Err(ServiceError::Transport(format!(
                "brand lookup failed with HTTP {s}"
            ))),
            s => Err(ServiceError::Protocol(format!(
                "brand lookup failed with HTTP {s}"
            ))),
        }
    }
}

/// Server errors plus the 4xx codes that only mean "not right now":
/// request timeout (408), too early (425) and rate limiting (429).
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || matches!(status.as_u16(), 408 | 425 | 429)
}
