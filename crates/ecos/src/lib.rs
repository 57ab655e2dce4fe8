//! ECOS (경제통계시스템, Economic Statistics System) central-bank-stats
//! adapter (spec.md §4.6 "Central-bank-stats client").

pub mod client;
pub mod error;

pub use client::EcosClient;
