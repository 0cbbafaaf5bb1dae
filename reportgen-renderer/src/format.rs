//! Display formatting for metric values.
//!
//! Every formatter takes an `Option<f64>` and yields [`MISSING`] for `None` or
//! a non-finite number, so templates never show `NaN` or an empty cell.

/// Glyph shown in place of a missing value.
pub const MISSING: &str = "—";

/// Compact dollar amount: `$999`, `$415K`, `$2.4M`.
///
/// The amount is rounded half away from zero before the unit is chosen, so
/// values that round up to the next unit are promoted (`999_999 → $1.0M`,
/// `999.5 → $1K`).
pub fn format_currency(value: Option<f64>) -> String {
    let Some(v) = finite(value) else {
        return MISSING.to_string();
    };
    let sign = if v < 0.0 { "-" } else { "" };
    let whole = v.abs().round();

    if whole >= 1_000.0 {
        let thousands = (whole / 1_000.0).round();
        if thousands < 1_000.0 {
            return format!("{sign}${thousands:.0}K");
        }
        let tenths = (whole / 100_000.0).round() as u64;
        return format!("{sign}${}.{}M", tenths / 10, tenths % 10);
    }
    format!("{sign}${whole:.0}")
}

/// Whole number with thousands separators: `1,284`.
pub fn format_count(value: Option<f64>) -> String {
    let Some(v) = finite(value) else {
        return MISSING.to_string();
    };
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_thousands(v.abs().round() as u64))
}

/// A value already expressed in percent: `3.2%`.
pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{v:.1}%"),
        None => MISSING.to_string(),
    }
}

/// Percent change with an explicit sign: `+3.2%`, `-1.0%`.
pub fn format_signed_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) if v > 0.0 => format!("+{v:.1}%"),
        Some(v) => format!("{v:.1}%"),
        None => MISSING.to_string(),
    }
}

/// A fraction shown as percent: `0.987 → 98.7%`.
pub fn format_fraction(value: Option<f64>) -> String {
    format_percent(finite(value).map(|v| v * 100.0))
}

/// `numerator / denominator` as percent; a missing or zero denominator yields
/// [`MISSING`].
pub fn format_ratio(numerator: Option<f64>, denominator: Option<f64>) -> String {
    match (finite(numerator), finite(denominator)) {
        (Some(n), Some(d)) if d != 0.0 => format_fraction(Some(n / d)),
        _ => MISSING.to_string(),
    }
}

/// Fixed number of decimal places: `2.8`.
pub fn format_decimal(value: Option<f64>, places: usize) -> String {
    match finite(value) {
        Some(v) => format!("{v:.places$}"),
        None => MISSING.to_string(),
    }
}

pub fn format_days(value: Option<f64>) -> String {
    match finite(value).map(f64::round) {
        Some(d) if d == 1.0 => "1 day".to_string(),
        Some(d) => format!("{d:.0} days"),
        None => MISSING.to_string(),
    }
}

pub fn format_distance(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{v:.1} mi"),
        None => MISSING.to_string(),
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
