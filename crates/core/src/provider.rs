//! The shared provider tag used for error provenance, rate-limiter keys,
//! cache-key prefixes, and config file naming.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four upstream data sources the core federates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// DART filings (전자공시시스템).
    Dart,
    /// KIS quotes (한국투자증권 Open API).
    Kis,
    /// ECOS central-bank statistics (한국은행 경제통계시스템).
    Ecos,
    /// KOSIS national statistics (국가통계포털).
    Kosis,
}

impl Provider {
    /// Returns the lowercase slug used in cache keys and config file names.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dart => "dart",
            Self::Kis => "kis",
            Self::Ecos => "ecos",
            Self::Kosis => "kosis",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
