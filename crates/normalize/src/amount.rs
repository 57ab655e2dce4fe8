//! Raw provider amount strings ↔ canonical numeric/display representation
//! (spec.md §4.9, §3 "Normalized Amount").
//!
//! All monetary values are exact won amounts; `rust_decimal::Decimal` is
//! used throughout instead of a floating-point type so formatting then
//! re-parsing never drifts (spec.md §8 "Amount roundtrip").

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The display-scale tag spec.md §3 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountScale {
    Won,
    /// 10^4
    Man,
    /// 10^8
    Eok,
    /// 10^12
    Jo,
}

impl AmountScale {
    #[must_use]
    pub fn by_magnitude(abs_value: Decimal) -> Self {
        if abs_value >= Decimal::from(1_000_000_000_000i64) {
            Self::Jo
        } else if abs_value >= Decimal::from(100_000_000i64) {
            Self::Eok
        } else if abs_value >= Decimal::from(10_000i64) {
            Self::Man
        } else {
            Self::Won
        }
    }

    fn divisor(self) -> Decimal {
        match self {
            Self::Won => Decimal::ONE,
            Self::Man => Decimal::from(10_000i64),
            Self::Eok => Decimal::from(100_000_000i64),
            Self::Jo => Decimal::from(1_000_000_000_000i64),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Won => "원",
            Self::Man => "만원",
            Self::Eok => "억원",
            Self::Jo => "조원",
        }
    }

    fn default_precision(self) -> u32 {
        match self {
            Self::Won | Self::Man => 0,
            Self::Eok | Self::Jo => 1,
        }
    }
}

/// A fully normalized amount, ready for display (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAmount {
    pub value: Option<Decimal>,
    pub display: String,
    pub unit: &'static str,
    pub scale: AmountScale,
    pub is_estimate: bool,
    pub source: String,
    pub as_of: NaiveDate,
}

/// Parses a raw provider amount string. `"-"`, empty, and
/// whitespace-only all mean "value unavailable".
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    Decimal::from_str(&cleaned).ok()
}

/// Formats `value` using scale suffix rules (spec.md §4.9). `None` always
/// formats as `"N/A"` regardless of other overrides.
#[must_use]
pub fn format_amount(
    value: Option<Decimal>,
    scale_override: Option<AmountScale>,
    precision_override: Option<u32>,
    show_sign: bool,
) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };
    let scale = scale_override.unwrap_or_else(|| AmountScale::by_magnitude(value.abs()));
    let precision = precision_override.unwrap_or_else(|| scale.default_precision());
    let scaled = (value / scale.divisor()).round_dp(precision);

    let mut formatted = format_with_thousands(scaled, precision);
    if show_sign && scaled > Decimal::ZERO {
        formatted.insert(0, '+');
    }
    format!("{formatted}{}", scale.suffix())
}

/// Builds a [`NormalizedAmount`] from a raw provider string.
#[must_use]
pub fn normalize_amount(raw: &str, source: &str, as_of: NaiveDate, is_estimate: bool) -> NormalizedAmount {
    let value = parse_amount(raw);
    let scale = value.map_or(AmountScale::Won, |v| AmountScale::by_magnitude(v.abs()));
    NormalizedAmount {
        value,
        display: format_amount(value, None, None, false),
        unit: scale.suffix(),
        scale,
        is_estimate,
        source: source.to_string(),
        as_of,
    }
}

const UNIT_SUFFIXES: &[(&str, i64)] = &[
    ("조원", 1_000_000_000_000),
    ("억원", 100_000_000),
    ("만원", 10_000),
    ("원", 1),
    ("조", 1_000_000_000_000),
    ("억", 100_000_000),
    ("만", 10_000),
    ("배", 1),
    ("%", 1),
];

/// Inverse of [`format_amount`]: parses a Korean-suffixed amount string
/// back into raw won. First matching suffix wins (spec.md §4.9); with no
/// suffix match, the numeric part is returned as-is in raw units.
#[must_use]
pub fn parse_korean_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    for (suffix, multiplier) in UNIT_SUFFIXES {
        if let Some(number_part) = trimmed.strip_suffix(suffix) {
            let cleaned = number_part.trim().replace(',', "");
            if let Ok(value) = Decimal::from_str(&cleaned) {
                return Some(value * Decimal::from(*multiplier));
            }
        }
    }
    let cleaned = trimmed.replace(',', "");
    Decimal::from_str(&cleaned).ok()
}

fn format_with_thousands(value: Decimal, precision: u32) -> String {
    let rounded = value.round_dp(precision);
    let negative = rounded.is_sign_negative();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };
    let mut out = group_thousands(&int_part);
    if let Some(frac) = frac_part {
        if precision > 0 {
            out.push('.');
            out.push_str(&frac);
        }
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}
