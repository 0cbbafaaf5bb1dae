//! Domain types for report generation.
//!
//! Requests are validated once, right before submission. Results, brand
//! profiles, and error details are plain serde values so they can travel over
//! the wire to and from the report service unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier assigned to a job by the report service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Request enums
// ---------------------------------------------------------------------------

/// The kind of market report to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    MarketSnapshot,
    NewListings,
    ClosedSales,
    PriceChanges,
    OpenHouses,
    Inventory,
}

impl ReportKind {
    pub fn all() -> &'static [ReportKind] {
        &[
            ReportKind::MarketSnapshot,
            ReportKind::NewListings,
            ReportKind::ClosedSales,
            ReportKind::PriceChanges,
            ReportKind::OpenHouses,
            ReportKind::Inventory,
        ]
    }

    /// Human title used on rendered covers.
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::MarketSnapshot => "Market Snapshot",
            ReportKind::NewListings => "New Listings",
            ReportKind::ClosedSales => "Closed Sales",
            ReportKind::PriceChanges => "Price Changes",
            ReportKind::OpenHouses => "Open Houses",
            ReportKind::Inventory => "Inventory Report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportKind::MarketSnapshot => "market_snapshot",
            ReportKind::NewListings => "new_listings",
            ReportKind::ClosedSales => "closed_sales",
            ReportKind::PriceChanges => "price_changes",
            ReportKind::OpenHouses => "open_houses",
            ReportKind::Inventory => "inventory",
        };
        f.write_str(s)
    }
}

/// Named audience presets the report service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceFilter {
    FirstTimeBuyers,
    Luxury,
    Families,
    Investors,
    Downsizers,
    Condos,
}

impl AudienceFilter {
    pub fn all() -> &'static [AudienceFilter] {
        &[
            AudienceFilter::FirstTimeBuyers,
            AudienceFilter::Luxury,
            AudienceFilter::Families,
            AudienceFilter::Investors,
            AudienceFilter::Downsizers,
            AudienceFilter::Condos,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudienceFilter::FirstTimeBuyers => "First-time buyers",
            AudienceFilter::Luxury => "Luxury",
            AudienceFilter::Families => "Families",
            AudienceFilter::Investors => "Investors",
            AudienceFilter::Downsizers => "Downsizers",
            AudienceFilter::Condos => "Condos",
        }
    }
}

/// Geographic scope of a report: a named area or an explicit postal-code set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeoScope {
    Area { name: String },
    PostalCodes { codes: Vec<String> },
}

impl GeoScope {
    pub fn area(name: impl Into<String>) -> Self {
        GeoScope::Area { name: name.into() }
    }

    pub fn postal_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GeoScope::PostalCodes {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Label printed on covers: the area name, or the codes joined by commas.
    pub fn label(&self) -> String {
        match self {
            GeoScope::Area { name } => name.trim().to_string(),
            GeoScope::PostalCodes { codes } => codes.join(", "),
        }
    }

    fn validate(&self) -> Result<(), RequestError> {
        match self {
            GeoScope::Area { name } if name.trim().is_empty() => Err(RequestError::EmptyArea),
            GeoScope::Area { .. } => Ok(()),
            GeoScope::PostalCodes { codes } if codes.is_empty() => {
                Err(RequestError::EmptyPostalCodes)
            }
            GeoScope::PostalCodes { codes } => {
                match codes.iter().find(|c| !is_postal_code(c)) {
                    Some(bad) => Err(RequestError::InvalidPostalCode(bad.clone())),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Which artifacts the user wants out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeliveryIntents {
    #[serde(default)]
    pub browse: bool,
    #[serde(default)]
    pub document: bool,
    #[serde(default)]
    pub social_image: bool,
    #[serde(default)]
    pub email: bool,
}

impl DeliveryIntents {
    pub fn any(&self) -> bool {
        self.browse || self.document || self.social_image || self.email
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// A fully configured report request, consumed once by submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ReportKind,
    pub scope: GeoScope,
    pub lookback_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceFilter>,
    pub delivery: DeliveryIntents,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
}

impl GenerationRequest {
    /// A request with a 30-day lookback and no delivery intents yet.
    pub fn new(kind: ReportKind, scope: GeoScope) -> Self {
        Self {
            kind,
            scope,
            lookback_days: 30,
            audience: None,
            delivery: DeliveryIntents::default(),
            recipients: Vec::new(),
        }
    }

    /// Checks every submission rule, returning the first one violated.
    pub fn validate(&self) -> Result<(), RequestError> {
        self.scope.validate()?;
        if self.lookback_days == 0 {
            return Err(RequestError::ZeroLookback);
        }
        if !self.delivery.any() {
            return Err(RequestError::NoDeliveryIntent);
        }
        if self.delivery.email {
            if self.recipients.is_empty() {
                return Err(RequestError::NoRecipients);
            }
            if let Some(bad) = self.recipients.iter().find(|r| !is_email(r)) {
                return Err(RequestError::InvalidRecipient(bad.clone()));
            }
        }
        Ok(())
    }

    /// Trims and de-duplicates recipients, keeping first-seen order.
    pub fn normalize_recipients(&mut self) {
        let mut seen = Vec::with_capacity(self.recipients.len());
        for r in self.recipients.drain(..) {
            let r = r.trim().to_ascii_lowercase();
            if !r.is_empty() && !seen.contains(&r) {
                seen.push(r);
            }
        }
        self.recipients = seen;
    }
}

fn is_postal_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}

fn is_email(addr: &str) -> bool {
    if addr.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// User-displayable failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Nullable numeric aggregates keyed by metric name. A `null` from the
/// service stays `None` rather than being dropped. Keys are kept sorted, so
/// re-serializing yields ascending name order, not the order received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Metrics(pub BTreeMap<String, Option<f64>>);

impl Metrics {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied().flatten()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.0.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, Option<f64>)> for Metrics {
    fn from_iter<T: IntoIterator<Item = (K, Option<f64>)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Kind of artifact the service rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Page,
    Document,
    SocialImage,
}

/// Link to one rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub url: String,
}

/// Success payload of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle state of the job owned by one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Generating { job_id: JobId, attempt: u32 },
    Succeeded { result: GenerationResult },
    Failed { error: ErrorDetail },
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Succeeded { .. } | Phase::Failed { .. } | Phase::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Generating { .. } => "generating",
            Phase::Succeeded { .. } => "succeeded",
            Phase::Failed { .. } => "failed",
            Phase::Cancelled => "cancelled",
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Phase::Generating { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            Phase::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            Phase::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Branding
// ---------------------------------------------------------------------------

/// White-label identity stamped onto rendered artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BrandProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
