//! Price snapshot and daily price history (spec.md §4.7 "price snapshot,
//! daily price history"), over the Quotes client.
//!
//! KIS's real tr_ids are threaded through the shared `params` slice the
//! same way [`crate::financial_statements`] threads `fs_div` — they are
//! not a generic concept the `Client` trait needs to know about.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const SNAPSHOT_ENDPOINT: &str = "uapi/domestic-stock/v1/quotations/inquire-price";
const SNAPSHOT_TR_ID: &str = "FHKST01010100";

const HISTORY_ENDPOINT: &str = "uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice";
const HISTORY_TR_ID: &str = "FHKST01010400";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub ticker: String,
    pub last_price: String,
    pub change: Option<String>,
    pub change_rate: Option<String>,
    pub volume: Option<String>,
}

/// One daily OHLCV bar as reported, before summary computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: String,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistorySummary {
    pub first_close: Decimal,
    pub last_close: Decimal,
    /// Percent return from first to last close, e.g. `12.5` for +12.5%.
    pub return_pct: Decimal,
    pub high: Decimal,
    pub high_date: String,
    pub low: Decimal,
    pub low_date: String,
    pub average_volume: Decimal,
    /// Closing prices in chronological order, for a terminal sparkline.
    pub sparkline: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub ticker: String,
    pub bars: Vec<DailyBar>,
    pub summary: Option<PriceHistorySummary>,
}

fn field(output: &serde_json::Value, key: &str) -> Option<String> {
    output.get(key).and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_price_snapshot(client: &dyn Client, ticker: &str, market_open: bool) -> ToolOutcome<PriceSnapshot> {
    let raw = client
        .request(
            SNAPSHOT_ENDPOINT,
            &[("tr_id", SNAPSHOT_TR_ID), ("FID_COND_MRKT_DIV_CODE", "J"), ("FID_INPUT_ISCD", ticker)],
            DataKind::LivePrice.cache_options(market_open),
            None,
        )
        .await?;

    let output = raw.body.get("output").cloned().unwrap_or(serde_json::Value::Null);
    let last_price = field(&output, "stck_prpr").unwrap_or_else(|| "0".to_string());

    Ok(ToolResult {
        data: PriceSnapshot {
            ticker: ticker.to_string(),
            last_price,
            change: field(&output, "prdy_vrss"),
            change_rate: field(&output, "prdy_ctrt"),
            volume: field(&output, "acml_vol"),
        },
        metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance),
    })
}

fn parse_decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or_default()
}

fn parse_bar(row: &serde_json::Value) -> Option<DailyBar> {
    let date = row.get("stck_bsop_date").and_then(serde_json::Value::as_str)?.to_string();
    let close = parse_decimal(row.get("stck_clpr").and_then(serde_json::Value::as_str).unwrap_or("0"));
    let high = parse_decimal(row.get("stck_hgpr").and_then(serde_json::Value::as_str).unwrap_or("0"));
    let low = parse_decimal(row.get("stck_lwpr").and_then(serde_json::Value::as_str).unwrap_or("0"));
    let volume: u64 = row.get("acml_vol").and_then(serde_json::Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
    Some(DailyBar { date, close, high, low, volume })
}

/// Computes the summary over `bars`, which must already be in
/// chronological order (oldest first).
fn summarize(bars: &[DailyBar]) -> Option<PriceHistorySummary> {
    let first = bars.first()?;
    let last = bars.last()?;

    let mut high = &bars[0];
    let mut low = &bars[0];
    let mut volume_sum = Decimal::ZERO;
    for bar in bars {
        if bar.high > high.high {
            high = bar;
        }
        if bar.low < low.low {
            low = bar;
        }
        volume_sum += Decimal::from(bar.volume);
    }

    let return_pct = if first.close.is_zero() {
        Decimal::ZERO
    } else {
        (last.close - first.close) / first.close * Decimal::from(100)
    };

    Some(PriceHistorySummary {
        first_close: first.close,
        last_close: last.close,
        return_pct,
        high: high.high,
        high_date: high.date.clone(),
        low: low.low,
        low_date: low.date.clone(),
        average_volume: volume_sum / Decimal::from(bars.len()),
        sparkline: bars.iter().map(|b| b.close).collect(),
    })
}

/// Fetches `start_date..=end_date` (both `YYYYMMDD`) daily bars for
/// `ticker` and computes the summary described in spec.md §4.7.
///
/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_price_history(
    client: &dyn Client,
    ticker: &str,
    start_date: &str,
    end_date: &str,
) -> ToolOutcome<PriceHistory> {
    let raw = client
        .request(
            HISTORY_ENDPOINT,
            &[
                ("tr_id", HISTORY_TR_ID),
                ("FID_COND_MRKT_DIV_CODE", "J"),
                ("FID_INPUT_ISCD", ticker),
                ("FID_INPUT_DATE_1", start_date),
                ("FID_INPUT_DATE_2", end_date),
                ("FID_PERIOD_DIV_CODE", "D"),
                ("FID_ORG_ADJ_PRC", "0"),
            ],
            // Historical bars for prior dates never change; today's bar
            // does, but it always falls under the default TTL policy a
            // caller can override by supplying `CacheOptions` directly.
            DataKind::HistoricalPrice.cache_options(false),
            None,
        )
        .await?;

    let mut bars: Vec<DailyBar> =
        raw.body.get("output2").and_then(serde_json::Value::as_array).into_iter().flatten().filter_map(parse_bar).collect();
    bars.sort_by(|a, b| a.date.cmp(&b.date));

    let summary = summarize(&bars);

    Ok(ToolResult {
        data: PriceHistory { ticker: ticker.to_string(), bars, summary },
        metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance),
    })
}
