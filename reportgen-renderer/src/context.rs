//! Report context: the placeholder values and conditions a report's pages
//! need, derived from the originating request and the service's result.
//!
//! Every well-known metric produces a formatted value under its own name
//! (`{{median_price}}`) and a `has_<name>` condition. Missing metrics format
//! as the [`MISSING`](crate::format::MISSING) glyph so pages never show raw
//! placeholders.

use reportgen_core::{GenerationRequest, GenerationResult, Metrics};
use tera::escape_html;

use crate::format::{
    format_count, format_currency, format_days, format_decimal, format_distance,
    format_fraction, format_ratio, format_signed_percent,
};
use crate::template::{is_name, Conditions, Values};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFormat {
    Currency,
    Count,
    Days,
    Fraction,
    Months,
    SignedPercent,
    Distance,
}

impl MetricFormat {
    pub fn apply(&self, value: Option<f64>) -> String {
        match self {
            MetricFormat::Currency => format_currency(value),
            MetricFormat::Count => format_count(value),
            MetricFormat::Days => format_days(value),
            MetricFormat::Fraction => format_fraction(value),
            MetricFormat::Months => format_decimal(value, 1),
            MetricFormat::SignedPercent => format_signed_percent(value),
            MetricFormat::Distance => format_distance(value),
        }
    }
}

/// Well-known metrics and how each is displayed.
pub const METRICS: &[(&str, MetricFormat)] = &[
    ("median_price", MetricFormat::Currency),
    ("median_list_price", MetricFormat::Currency),
    ("active_listings", MetricFormat::Count),
    ("new_listings", MetricFormat::Count),
    ("closed_sales", MetricFormat::Count),
    ("pending_sales", MetricFormat::Count),
    ("median_days_on_market", MetricFormat::Days),
    ("sale_to_list_ratio", MetricFormat::Fraction),
    ("months_of_inventory", MetricFormat::Months),
    ("avg_price_per_sqft", MetricFormat::Currency),
    ("avg_distance_miles", MetricFormat::Distance),
    ("price_change_pct", MetricFormat::SignedPercent),
];

/// Short names the service may send for well-known metrics.
const ALIASES: &[(&str, &str)] = &[
    ("median", "median_price"),
    ("list_price", "median_list_price"),
    ("dom", "median_days_on_market"),
];

/// Placeholder values and conditions for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    values: Values,
    conditions: Conditions,
}

impl ReportContext {
    pub fn new(request: &GenerationRequest, result: &GenerationResult) -> Self {
        let mut values = Values::new();
        let mut conditions = Conditions::new();

        let days = request.lookback_days;
        let lookback = match days {
            1 => "Last day".to_string(),
            n => format!("Last {n} days"),
        };
        values
            .insert("report_title", request.kind.title())
            .insert("report_kind", request.kind.to_string())
            .insert("area_label", escape_html(&request.scope.label()))
            .insert("lookback_days", days.to_string())
            .insert("lookback_label_lower", lookback.to_lowercase())
            .insert("lookback_label", lookback)
            .insert(
                "generated_on",
                result.generated_at.format("%B %-d, %Y").to_string(),
            );
        match request.audience {
            Some(audience) => {
                values.insert("audience_label", audience.label());
                conditions.set("has_audience", true);
            }
            None => {
                values.insert("audience_label", "");
                conditions.set("has_audience", false);
            }
        }

        let metrics = canonical_metrics(&result.metrics);
        bind_metrics(&metrics, &mut values, &mut conditions);

        Self { values, conditions }
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Extra value on top of the derived ones, e.g. page numbering.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name, value);
        self
    }
}

/// Payload metrics with aliases folded into their canonical names. An
/// explicit canonical entry wins over its alias.
fn canonical_metrics(raw: &Metrics) -> Metrics {
    let mut out = raw.clone();
    for (alias, canonical) in ALIASES {
        if out.get(canonical).is_some() {
            continue;
        }
        if let Some(value) = raw.get(alias) {
            out.insert(*canonical, Some(value));
        }
    }
    out
}

fn bind_metrics(metrics: &Metrics, values: &mut Values, conditions: &mut Conditions) {
    for (name, format) in METRICS {
        let value = present(metrics.get(name));
        values.insert(*name, format.apply(value));
        conditions.set(format!("has_{name}"), value.is_some());
    }

    let sale_to_list = match present(metrics.get("sale_to_list_ratio")) {
        Some(ratio) => format_fraction(Some(ratio)),
        None => format_ratio(metrics.get("median_price"), metrics.get("median_list_price")),
    };
    let absorption = format_ratio(metrics.get("closed_sales"), metrics.get("active_listings"));
    for (name, text) in [("sale_to_list", sale_to_list), ("absorption_rate", absorption)] {
        conditions.set(format!("has_{name}"), text != crate::format::MISSING);
        values.insert(name, text);
    }

    // Anything else the service sent stays reachable as `metric.<name>`.
    for (name, value) in metrics.iter() {
        if !is_name(name) {
            continue;
        }
        let text = match present(value) {
            Some(v) if v.fract() == 0.0 => format_count(Some(v)),
            other => format_decimal(other, 2),
        };
        values.insert(format!("metric.{name}"), text);
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
