//! Central-bank/national time-series indicator (spec.md §4.7), over the
//! ECOS `StatisticSearch` endpoint.

use rust_decimal::Decimal;
use std::str::FromStr;

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const TIME_SERIES_ENDPOINT: &str = "StatisticSearch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorObservation {
    pub time: String,
    pub value: Option<Decimal>,
    pub raw: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSeries {
    pub table: String,
    pub observations: Vec<IndicatorObservation>,
}

fn parse_row(row: &serde_json::Value) -> Option<IndicatorObservation> {
    let time = row.get("TIME").and_then(serde_json::Value::as_str)?.to_string();
    let raw = row.get("DATA_VALUE").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    let value = Decimal::from_str(raw.trim()).ok();
    let unit = row.get("UNIT_NAME").and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_string);
    Some(IndicatorObservation { time, value, raw, unit })
}

/// `period_type` is ECOS's own code (`"D"`/`"M"`/`"Q"`/`"A"`, day/month/
/// quarter/year); `start_date`/`end_date` are in the matching format.
/// The series is periodically re-checked for the current (still
/// accumulating) period — callers pass `is_current_period` to select the
/// shorter TTL (spec.md §4.7 freshness table).
///
/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_time_series_indicator(
    client: &dyn Client,
    table: &str,
    period_type: &str,
    start_date: &str,
    end_date: &str,
    item1: Option<&str>,
    is_current_period: bool,
) -> ToolOutcome<IndicatorSeries> {
    let kind = if is_current_period { DataKind::IndicatorCurrentPeriod } else { DataKind::IndicatorClosedPeriod };
    let mut params = vec![("table", table), ("period_type", period_type), ("start_date", start_date), ("end_date", end_date)];
    if let Some(item1) = item1 {
        params.push(("item1", item1));
    }

    let raw = client.request(TIME_SERIES_ENDPOINT, &params, kind.cache_options(false), None).await?;

    let observations = raw
        .body
        .get(TIME_SERIES_ENDPOINT)
        .and_then(|v| v.get("row"))
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(parse_row)
        .collect();

    Ok(ToolResult {
        data: IndicatorSeries { table: table.to_string(), observations },
        metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance),
    })
}
