//! Catalog search (spec.md §4.7), over the ECOS `StatisticWord` endpoint.

use krfin_network::Client;

use crate::freshness::DataKind;
use crate::result::{ToolMetadata, ToolOutcome, ToolResult};

const ENDPOINT: &str = "StatisticWord";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub word: String,
    pub explanation: String,
}

/// # Errors
///
/// Propagates the underlying client's [`krfin_core::ToolError`] unchanged.
pub async fn search_catalog(client: &dyn Client, query: &str, market_open: bool) -> ToolOutcome<Vec<CatalogEntry>> {
    let raw = client.request(ENDPOINT, &[("query", query)], DataKind::CatalogSearch.cache_options(market_open), None).await?;

    let entries = raw
        .body
        .get(ENDPOINT)
        .and_then(|v| v.get("row"))
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|row| {
            let word = row.get("WORD").and_then(serde_json::Value::as_str)?.to_string();
            let explanation = row.get("CONTENT").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
            Some(CatalogEntry { word, explanation })
        })
        .collect();

    Ok(ToolResult { data: entries, metadata: ToolMetadata::from_response(&raw.metadata, raw.provenance) })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use krfin_core::ToolError;
    use krfin_network::{CacheOptions, Provenance, RawResponse, ResponseMetadata};
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;

    struct StubClient(serde_json::Value);

    #[async_trait]
    impl Client for StubClient {
        async fn request(
            &self,
            _endpoint: &str,
            _params: &[(&str, &str)],
            _cache_opts: CacheOptions,
            _cancel: Option<&CancellationToken>,
        ) -> Result<RawResponse, ToolError> {
            Ok(RawResponse {
                body: self.0.clone(),
                metadata: ResponseMetadata {
                    response_time: std::time::Duration::from_millis(1),
                    remaining_daily: 10,
                    market_open: true,
                    used_fallback: false,
                },
                provenance: Provenance::Origin,
            })
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_parses_catalog_entries() {
        let client = StubClient(serde_json::json!({
            "StatisticWord": {"row": [{"WORD": "기준금리", "CONTENT": "한국은행이 결정하는 정책금리"}]},
        }));
        let result = search_catalog(&client, "기준금리", true).await.unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].word, "기준금리");
    }
}
