//! Key-statistics list (spec.md §4.7), over the KOSIS `statisticsData.do`
//! endpoint.

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const ENDPOINT: &str = "statisticsData.do";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatistic {
    pub name: Option<String>,
    pub period: String,
    pub value: String,
}

/// `org_id`/`tbl_id` select the KOSIS table; `items` is the raw
/// remaining parameter set the caller has already resolved (item codes,
/// classification codes) — KOSIS's table schema varies too widely per
/// statistic to model generically here.
///
/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_key_statistics(
    client: &dyn Client,
    org_id: &str,
    tbl_id: &str,
    items: &[(&str, &str)],
    market_open: bool,
) -> ToolOutcome<Vec<KeyStatistic>> {
    let mut params = vec![("orgId", org_id), ("tblId", tbl_id)];
    params.extend(items.iter().copied());

    let raw = client.request(ENDPOINT, &params, DataKind::DisclosureListings.cache_options(market_open), None).await?;

    let field = |row: &serde_json::Value, key: &str| row.get(key).and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    let stats = raw
        .body
        .as_array()
        .into_iter()
        .flatten()
        .map(|row| KeyStatistic {
            name: row.get("ITM_NM").and_then(serde_json::Value::as_str).map(str::to_string),
            period: field(row, "PRD_DE"),
            value: field(row, "DT"),
        })
        .collect();

    Ok(ToolResult { data: stats, metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance) })
}
