#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use reportgen_core::{
    Artifact, ArtifactKind, DeliveryIntents, ErrorDetail, GenerationRequest, GenerationResult,
    GeoScope, JobId, ReportKind,
};
use reportgen_jobs::{JobService, JobStatus, ServiceError};

/// Job service that plays back a fixed script of answers.
pub struct ScriptedService {
    submit: Mutex<Option<Result<JobId, ServiceError>>>,
    submit_delay: Duration,
    statuses: Mutex<VecDeque<Result<JobStatus, ServiceError>>>,
    fallback: Result<JobStatus, ServiceError>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedService {
    /// Accepts as `job-1` and reports `Running` forever.
    pub fn new() -> Self {
        Self {
            submit: Mutex::new(None),
            submit_delay: Duration::ZERO,
            statuses: Mutex::new(VecDeque::new()),
            fallback: Ok(JobStatus::Running),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn submit_with(self, outcome: Result<JobId, ServiceError>) -> Self {
        *self.submit.lock().unwrap() = Some(outcome);
        self
    }

    pub fn submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn then(self, status: Result<JobStatus, ServiceError>) -> Self {
        self.statuses.lock().unwrap().push_back(status);
        self
    }

    pub fn then_running(self, times: usize) -> Self {
        (0..times).fold(self, |s, _| s.then(Ok(JobStatus::Running)))
    }

    pub fn otherwise(mut self, status: Result<JobStatus, ServiceError>) -> Self {
        self.fallback = status;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobService for ScriptedService {
    async fn submit(&self, _request: &GenerationRequest) -> Result<JobId, ServiceError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        let scripted = self.submit.lock().unwrap().clone();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(JobId(format!("job-{n}"))),
        }
    }

    async fn status(&self, _job_id: &JobId) -> Result<JobStatus, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn austin_request() -> GenerationRequest {
    let mut request = GenerationRequest::new(ReportKind::MarketSnapshot, GeoScope::area("Austin"));
    request.delivery = DeliveryIntents {
        browse: true,
        document: true,
        ..DeliveryIntents::default()
    };
    request
}

pub fn austin_result() -> GenerationResult {
    GenerationResult {
        metrics: [
            ("median_price", Some(825_000.0)),
            ("closed_sales", Some(41.0)),
            ("months_of_inventory", None),
        ]
        .into_iter()
        .collect(),
        artifacts: vec![Artifact {
            kind: ArtifactKind::Document,
            url: "https://files.example.com/reports/austin.pdf".into(),
        }],
        generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
    }
}

pub fn failed(message: &str) -> Result<JobStatus, ServiceError> {
    Ok(JobStatus::Failed(ErrorDetail::new(message)))
}
