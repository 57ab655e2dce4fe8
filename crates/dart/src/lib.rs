//! DART (전자공시시스템, Data Analysis, Retrieval and Transfer System)
//! filings provider adapter (spec.md §4.6 "Filings client").

pub mod client;
pub mod corp_codes;
pub mod error;

pub use client::DartClient;
