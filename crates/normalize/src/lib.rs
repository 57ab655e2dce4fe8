//! Pure, IO-free transforms between provider-native and canonical
//! representations (spec.md §4.9): amounts and periods.

pub mod amount;
pub mod period;

pub use amount::{AmountScale, NormalizedAmount, format_amount, normalize_amount, parse_amount, parse_korean_amount};
pub use period::{PeriodKind, PeriodRange, centralbank_period, filings_period, quotes_period};
