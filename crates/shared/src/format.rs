use num_format::{Locale, ToFormattedString};
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";

/// en-US grouping with at most three fraction digits: `1234.5` → `1,234.5`.
pub fn format_grouped(value: f64) -> String {
    format_fixed(value, 0, 3)
}

/// Abbreviates large magnitudes: `999` → `999`, `1500` → `1.5K`,
/// `2_300_000` → `2.3M`, `4_100_000_000` → `4.1B`.
pub fn format_compact_number(value: f64) -> String {
    if value < 1_000.0 {
        format_grouped(value)
    } else if value < 1_000_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else if value < 1_000_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else {
        format!("{:.1}B", value / 1_000_000_000.0)
    }
}

pub fn format_optional_compact(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format_compact_number(value),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Dollar amount; sub-dollar prices keep four to six fraction digits.
pub fn format_currency_usd(value: f64) -> String {
    let digits = if value < 1.0 {
        format_fixed(value.abs(), 4, 6)
    } else {
        format_fixed(value.abs(), 2, 2)
    };
    if value < 0.0 && digits.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        format!("-${}", digits)
    } else {
        format!("${}", digits)
    }
}

pub fn format_optional_currency(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format_currency_usd(value),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// `+1.23%` / `-4.50%`; a missing change reads as `+0.00%`.
pub fn format_percent_change(change: Option<f64>) -> String {
    let change = change.filter(|value| value.is_finite()).unwrap_or(0.0);
    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, change)
}

/// Market share with one decimal: `52.3%`.
pub fn format_dominance(share: f64) -> String {
    format!("{:.1}%", share)
}

/// `8/10`, or `N/A` when the exchange has no score.
pub fn format_trust_score(score: Option<f64>) -> String {
    match score.filter(|score| *score > 0.0) {
        Some(score) => format!("{}/10", format_grouped(score)),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    High,
    Medium,
    Low,
}

impl TrustLevel {
    /// A zero score counts as missing, same as the upstream `0` placeholder.
    pub fn from_score(score: Option<f64>) -> Option<Self> {
        let score = score.filter(|score| *score > 0.0)?;
        Some(if score >= 8.0 {
            TrustLevel::High
        } else if score >= 6.0 {
            TrustLevel::Medium
        } else {
            TrustLevel::Low
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn from_change(change: Option<f64>) -> Self {
        if change.unwrap_or(0.0) >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

fn format_fixed(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let rounded = format!("{:.*}", max_fraction, value.abs());
    let (integer, fraction) = match rounded.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (rounded.as_str(), ""),
    };

    let mut fraction = fraction.trim_end_matches('0');
    if fraction.len() < min_fraction {
        fraction = &rounded[rounded.len() - max_fraction..][..min_fraction];
    }

    let mut out = String::new();
    let is_zero = !rounded.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    match integer.parse::<u128>() {
        Ok(whole) => out.push_str(&whole.to_formatted_string(&Locale::en)),
        Err(_) => out.push_str(integer),
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}
