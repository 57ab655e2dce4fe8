//! Market-index snapshot (spec.md §4.7), over the Quotes client's index
//! inquiry endpoint.

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const ENDPOINT: &str = "uapi/domestic-stock/v1/quotations/inquire-index-price";
const TR_ID: &str = "FHPUP02100000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketIndexSnapshot {
    pub index_code: String,
    pub value: String,
    pub change: Option<String>,
    pub change_rate: Option<String>,
}

/// `index_code` is a KIS condition code such as `"0001"` (KOSPI) or
/// `"1001"` (KOSDAQ).
///
/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_market_index_snapshot(
    client: &dyn Client,
    index_code: &str,
    market_open: bool,
) -> ToolOutcome<MarketIndexSnapshot> {
    let raw = client
        .request(
            ENDPOINT,
            &[("tr_id", TR_ID), ("FID_COND_MRKT_DIV_CODE", "U"), ("FID_INPUT_ISCD", index_code)],
            DataKind::LivePrice.cache_options(market_open),
            None,
        )
        .await?;

    let output = raw.body.get("output").cloned().unwrap_or(serde_json::Value::Null);
    let field = |key: &str| output.get(key).and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_string);

    Ok(ToolResult {
        data: MarketIndexSnapshot {
            index_code: index_code.to_string(),
            value: field("bstp_nmix_prpr").unwrap_or_else(|| "0".to_string()),
            change: field("bstp_nmix_prdy_vrss"),
            change_rate: field("bstp_nmix_prdy_ctrt"),
        },
        metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance),
    })
}
