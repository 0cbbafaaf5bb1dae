//! reportgen core library: domain types, configuration file, errors.
//!
//! - [`types`]: requests, job phases, results, brand profiles
//! - [`config`]: `~/.reportgen/config.yaml` load / save / init
//! - [`error`]: [`ConfigError`], [`RequestError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::{ConfigError, RequestError};
pub use types::{
    Artifact, ArtifactKind, AudienceFilter, BrandProfile, DeliveryIntents, ErrorDetail,
    GenerationRequest, GenerationResult, GeoScope, JobId, Metrics, Phase, ReportKind,
};
