//! The financial-statement fetch (spec.md §4.7 steps 1-3): consolidated-
//! first with a single fallback to the separate division, account-level
//! amount normalization, and concept tagging.

use chrono::NaiveDate;
use krfin_core::time::{Clock, SystemClock};
use krfin_core::{Provider, ToolError, ToolErrorKind};
use krfin_network::{CacheOptions, Client, Provenance};
use krfin_normalize::amount::{normalize_amount, NormalizedAmount};
use krfin_normalize::period::{filings_period, PeriodRange};
use serde::{Deserialize, Serialize};

use crate::concept::ConceptMapper;
use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const ENDPOINT: &str = "fnlttSinglAcntAll";
const DEFAULT_FS_DIV: &str = "CFS";
const FALLBACK_FS_DIV: &str = "OFS";

/// One reported account line, current and prior period normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementAccount {
    pub account_name: String,
    pub concept: Option<String>,
    pub current: NormalizedAmount,
    pub prior: NormalizedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub corp_code: String,
    pub fs_div: String,
    pub period: Option<PeriodRange>,
    pub accounts: Vec<FinancialStatementAccount>,
}

/// Calls the Filings client for `corp_code`/`year`/`report_code`.
///
/// `fs_div` is the caller's explicit request (`"CFS"` or `"OFS"`); `None`
/// means "no preference", which is the only case that triggers the
/// CFS→OFS fallback on `NotFound` (spec.md §8 "Fallback tagging": an
/// explicit request must never have its `NotFound` silently converted).
///
/// # Errors
///
/// Propagates the underlying client's [`ToolError`] unchanged, except
/// that a `NotFound` on the implicit-CFS attempt is retried once against
/// OFS before being surfaced.
pub async fn get_financial_statements(
    client: &dyn Client,
    concept_mapper: &dyn ConceptMapper,
    corp_code: &str,
    year: &str,
    report_code: &str,
    fs_div: Option<&str>,
    market_open: bool,
) -> ToolOutcome<FinancialStatements> {
    let requested_explicitly = fs_div.is_some();
    let first_div = fs_div.unwrap_or(DEFAULT_FS_DIV).to_string();
    let cache_opts = DataKind::FinancialStatement.cache_options(market_open);

    let first_attempt = fetch_division(client, corp_code, year, report_code, &first_div, cache_opts.clone()).await;

    let (raw, used_div, used_fallback) = match first_attempt {
        Ok(raw) => (raw, first_div, false),
        Err(err) if err.kind == ToolErrorKind::NotFound && !requested_explicitly => {
            let raw = fetch_division(client, corp_code, year, report_code, FALLBACK_FS_DIV, cache_opts).await?;
            (raw, FALLBACK_FS_DIV.to_string(), true)
        }
        Err(err) => return Err(err),
    };

    let mut metadata = ToolMetadata::from_response(&raw.metadata, raw.provenance);
    metadata.used_fallback = used_fallback;
    metadata.fs_div = Some(used_div.clone());

    let year_num: i32 = year
        .parse()
        .map_err(|_| ToolError::new(ToolErrorKind::ParseError, Provider::Dart, format!("invalid year: {year}")))?;
    let period = filings_period(report_code, year_num);

    let accounts = parse_accounts(&raw.body, concept_mapper, &used_div, period.as_ref().map(|p| p.end));

    Ok(ToolResult {
        data: FinancialStatements { corp_code: corp_code.to_string(), fs_div: used_div, period, accounts },
        metadata,
    })
}

async fn fetch_division(
    client: &dyn Client,
    corp_code: &str,
    year: &str,
    report_code: &str,
    fs_div: &str,
    cache_opts: CacheOptions,
) -> Result<krfin_network::RawResponse, ToolError> {
    client
        .request(
            ENDPOINT,
            &[("corp_code", corp_code), ("bsns_year", year), ("reprt_code", report_code), ("fs_div", fs_div)],
            cache_opts,
            None,
        )
        .await
}

fn parse_accounts(
    body: &serde_json::Value,
    concept_mapper: &dyn ConceptMapper,
    fs_div: &str,
    as_of: Option<NaiveDate>,
) -> Vec<FinancialStatementAccount> {
    let as_of = as_of.unwrap_or_else(|| krfin_core::time::to_kst(SystemClock.now_utc()).date_naive());
    let Some(list) = body.get("list").and_then(serde_json::Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|row| {
            let account_name = row.get("account_nm").and_then(serde_json::Value::as_str)?.to_string();
            let current_raw = row.get("thstrm_amount").and_then(serde_json::Value::as_str).unwrap_or("");
            let prior_raw = row.get("frmtrm_amount").and_then(serde_json::Value::as_str).unwrap_or("");
            let source = format!("dart:{fs_div}");
            let current = normalize_amount(current_raw, &source, as_of, false);
            let prior = normalize_amount(prior_raw, &source, as_of, false);
            let concept = concept_mapper.map_concept(&account_name);
            Some(FinancialStatementAccount { account_name, concept, current, prior })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use krfin_core::ToolErrorKind;
    use krfin_network::ResponseMetadata;
    use rstest::rstest;
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::concept::NoopConceptMapper;

    struct StubClient {
        responses: Mutex<Vec<Result<serde_json::Value, ToolErrorKind>>>,
        seen_fs_divs: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn new(responses: Vec<Result<serde_json::Value, ToolErrorKind>>) -> Self {
            Self { responses: Mutex::new(responses), seen_fs_divs: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Client for StubClient {
        async fn request(
            &self,
            _endpoint: &str,
            params: &[(&str, &str)],
            _cache_opts: CacheOptions,
            _cancel: Option<&CancellationToken>,
        ) -> Result<krfin_network::RawResponse, ToolError> {
            let fs_div = params.iter().find(|(k, _)| *k == "fs_div").map(|(_, v)| (*v).to_string()).unwrap_or_default();
            self.seen_fs_divs.lock().await.push(fs_div);

            let mut responses = self.responses.lock().await;
            let next = responses.remove(0);
            match next {
                Ok(body) => Ok(krfin_network::RawResponse {
                    body,
                    metadata: ResponseMetadata {
                        response_time: StdDuration::from_millis(1),
                        remaining_daily: 100,
                        market_open: true,
                        used_fallback: false,
                    },
                    provenance: Provenance::Origin,
                }),
                Err(kind) => Err(ToolError::with_retryable(kind, Provider::Dart, "stub error", kind == ToolErrorKind::RateLimited)),
            }
        }
    }

    fn sample_body(fs_div: &str) -> serde_json::Value {
        serde_json::json!({
            "status": "000",
            "list": [
                {
                    "fs_div": fs_div,
                    "account_nm": "매출액",
                    "thstrm_amount": "1,234,567",
                    "frmtrm_amount": "1,000,000",
                },
            ],
        })
    }

    #[rstest]
    #[tokio::test]
    async fn test_default_cfs_success_has_no_fallback() {
        let client = StubClient::new(vec![Ok(sample_body("CFS"))]);
        let result = get_financial_statements(&client, &NoopConceptMapper, "00126380", "2024", "11011", None, true)
            .await
            .unwrap();
        assert!(!result.metadata.used_fallback);
        assert_eq!(result.metadata.fs_div, Some("CFS".to_string()));
        assert_eq!(result.data.accounts.len(), 1);
        assert_eq!(result.data.accounts[0].account_name, "매출액");
    }

    #[rstest]
    #[tokio::test]
    async fn test_cfs_not_found_falls_back_to_ofs() {
        let client =
            StubClient::new(vec![Err(ToolErrorKind::NotFound), Ok(sample_body("OFS"))]);
        let result = get_financial_statements(&client, &NoopConceptMapper, "00126380", "2024", "11011", None, true)
            .await
            .unwrap();
        assert!(result.metadata.used_fallback);
        assert_eq!(result.metadata.fs_div, Some("OFS".to_string()));
        assert_eq!(result.data.fs_div, "OFS");

        let seen = client.seen_fs_divs.lock().await;
        assert_eq!(*seen, vec!["CFS".to_string(), "OFS".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_explicit_ofs_not_found_is_not_converted() {
        let client = StubClient::new(vec![Err(ToolErrorKind::NotFound)]);
        let err = get_financial_statements(&client, &NoopConceptMapper, "00126380", "2024", "11011", Some("OFS"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);

        let seen = client.seen_fs_divs.lock().await;
        assert_eq!(*seen, vec!["OFS".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_other_error_does_not_trigger_fallback() {
        let client = StubClient::new(vec![Err(ToolErrorKind::RateLimited)]);
        let err = get_financial_statements(&client, &NoopConceptMapper, "00126380", "2024", "11011", None, true)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::RateLimited);

        let seen = client.seen_fs_divs.lock().await;
        assert_eq!(*seen, vec!["CFS".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_concept_mapper_tags_accounts() {
        struct RevenueMapper;
        impl ConceptMapper for RevenueMapper {
            fn map_concept(&self, account_name: &str) -> Option<String> {
                (account_name == "매출액").then(|| "Revenue".to_string())
            }
        }

        let client = StubClient::new(vec![Ok(sample_body("CFS"))]);
        let result = get_financial_statements(&client, &RevenueMapper, "00126380", "2024", "11011", None, true)
            .await
            .unwrap();
        assert_eq!(result.data.accounts[0].concept, Some("Revenue".to_string()));
    }
}
