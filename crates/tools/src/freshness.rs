//! Default TTLs per data kind (spec.md §4.7 "Freshness policy"),
//! overridable per call by passing an explicit [`CacheOptions`] instead
//! of the preset this module returns.

use std::time::Duration;

use krfin_network::CacheOptions;

const ONE_HOUR: Duration = Duration::from_secs(3600);
const THIRTY_SECONDS: Duration = Duration::from_secs(30);
const SEVEN_DAYS: Duration = Duration::from_secs(7 * 24 * 3600);
const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 3600);

/// The categories of data a tool function fetches, each with its own
/// default freshness requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Historical financial statement, immutable once filed.
    FinancialStatement,
    CompanyOverview,
    DisclosureListings,
    /// Live price during market hours vs. after close carries a
    /// different TTL (spec.md §4.7 table).
    LivePrice,
    HistoricalPrice,
    /// A central-bank/national-stats indicator whose period has already
    /// closed vs. one still accumulating (the current period) carries a
    /// different TTL.
    IndicatorClosedPeriod,
    IndicatorCurrentPeriod,
    CatalogSearch,
}

impl DataKind {
    /// Resolves the default [`CacheOptions`] for this kind. `market_open`
    /// only matters for [`DataKind::LivePrice`].
    #[must_use]
    pub fn cache_options(self, market_open: bool) -> CacheOptions {
        match self {
            Self::FinancialStatement | Self::HistoricalPrice => CacheOptions::default().permanent(),
            Self::CompanyOverview | Self::CatalogSearch => CacheOptions::default().with_ttl(THIRTY_DAYS),
            Self::DisclosureListings => CacheOptions::default().with_ttl(ONE_HOUR),
            Self::LivePrice => {
                if market_open {
                    CacheOptions::default().with_ttl(THIRTY_SECONDS)
                } else {
                    CacheOptions::default().with_ttl(ONE_HOUR)
                }
            }
            Self::IndicatorClosedPeriod => CacheOptions::default().with_ttl(SEVEN_DAYS),
            Self::IndicatorCurrentPeriod => CacheOptions::default().with_ttl(ONE_HOUR),
        }
    }
}
