//! Typed domain-level tool functions composed from the four provider
//! adapters (spec.md §4.7), the downstream interface external agent/CLI
//! code calls (spec.md §6).
//!
//! Every function here takes `&dyn krfin_network::Client` rather than a
//! concrete adapter type, the same seam `OKXHttpClient`'s parse helpers
//! are built against — callers (and tests) can substitute any client
//! implementation.

pub mod catalog_search;
pub mod company_info;
pub mod concept;
pub mod financial_statements;
pub mod freshness;
pub mod indicator;
pub mod key_statistics;
pub mod market_index;
pub mod price;
pub mod result;

pub use catalog_search::{CatalogEntry, search_catalog};
pub use company_info::{CompanyInfo, get_company_info};
pub use concept::{ConceptMapper, NoopConceptMapper};
pub use financial_statements::{FinancialStatementAccount, FinancialStatements, get_financial_statements};
pub use freshness::DataKind;
pub use indicator::{IndicatorObservation, IndicatorSeries, get_time_series_indicator};
pub use key_statistics::{KeyStatistic, get_key_statistics};
pub use market_index::{MarketIndexSnapshot, get_market_index_snapshot};
pub use price::{DailyBar, PriceHistory, PriceHistorySummary, PriceSnapshot, get_price_history, get_price_snapshot};
pub use result::{ToolMetadata, ToolOutcome, ToolResult};
