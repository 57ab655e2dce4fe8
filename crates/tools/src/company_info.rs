//! Company overview (spec.md §4.7 "Other tool functions: company info"),
//! a thin parse over the Filings `company` endpoint.

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    pub corp_code: String,
    pub corp_name: String,
    pub stock_code: Option<String>,
    pub ceo_name: Option<String>,
    pub industry_code: Option<String>,
    pub establishment_date: Option<String>,
}

fn opt_str(body: &serde_json::Value, key: &str) -> Option<String> {
    body.get(key).and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn get_company_info(client: &dyn Client, corp_code: &str, market_open: bool) -> ToolOutcome<CompanyInfo> {
    let raw = client
        .request("company", &[("corp_code", corp_code)], DataKind::CompanyOverview.cache_options(market_open), None)
        .await?;

    let corp_name = raw.body.get("corp_name").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();

    Ok(ToolResult {
        data: CompanyInfo {
            corp_code: corp_code.to_string(),
            corp_name,
            stock_code: opt_str(&raw.body, "stock_code"),
            ceo_name: opt_str(&raw.body, "ceo_nm"),
            industry_code: opt_str(&raw.body, "induty_code"),
            establishment_date: opt_str(&raw.body, "est_dt"),
        },
        metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance),
    })
}
