//! KOSIS (국가통계포털, Korean Statistical Information Service)
//! national-stats adapter (spec.md §4.6 "National-stats client").

pub mod client;
pub mod error;

pub use client::KosisClient;
