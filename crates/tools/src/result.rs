//! The typed envelope every tool function returns (spec.md §4.6/§4.7:
//! "Output: Tool Result<T>").

use std::time::Duration;

use krfin_network::Provenance;

/// Kept distinct from [`ToolResult`] (the success envelope) so call sites
/// can write `-> ToolOutcome<CompanyInfo>` directly as the return type.
pub type ToolOutcome<T> = Result<ToolResult<T>, krfin_core::ToolError>;

/// Metadata every tool function attaches to its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    pub response_time: Duration,
    pub remaining_daily: u64,
    pub market_open: bool,
    /// True when the financial-statement fetch fell back from CFS to OFS
    /// (spec.md §8 "Fallback tagging").
    pub used_fallback: bool,
    /// The financial-statement division actually used ("CFS"/"OFS"),
    /// `None` for tool functions that are not a financial-statement
    /// fetch.
    pub fs_div: Option<String>,
    pub provenance: Provenance,
}

impl ToolMetadata {
    #[must_use]
    pub fn from_response(metadata: &krfin_network::ResponseMetadata, provenance: Provenance) -> Self {
        Self {
            response_time: metadata.response_time,
            remaining_daily: metadata.remaining_daily,
            market_open: metadata.market_open,
            used_fallback: metadata.used_fallback,
            fs_div: None,
            provenance,
        }
    }
}

/// A typed domain result plus the metadata describing how it was
/// obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult<T> {
    pub data: T,
    pub metadata: ToolMetadata,
}
