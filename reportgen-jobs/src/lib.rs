//! Job orchestration for market reports.
//!
//! - [`orchestrator`]: the submit/poll state machine, run as an actor
//! - [`service`] and [`http`]: the remote job service and brand source
//! - [`pipeline`]: submit, wait, then render with the account's brand
//! - [`preview`]: debounced single-page rendering for live editors

mod error;
pub mod http;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod preview;
pub mod service;

pub use error::{OrchestratorError, PreviewError, ServiceError};
pub use http::{HttpBrandSource, HttpJobService};
pub use logging::init_tracing;
pub use orchestrator::{
    estimate_progress, poll, Orchestrator, OrchestratorConfig, OrchestratorHandle, PollOutcome,
    Snapshot,
};
pub use pipeline::{generate_report, ReportOutput};
pub use preview::{PreviewFrame, PreviewRequest, PreviewSession, DEFAULT_DEBOUNCE};
pub use service::{BrandSource, FileBrandSource, JobService, JobStatus, StaticBrand};
