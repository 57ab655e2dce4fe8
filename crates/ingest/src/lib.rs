//! Resumable bulk ingester (spec.md §4.10): drives the Filings and
//! Quotes providers over a capped list of companies, checkpointing
//! progress into a local SQLite-shaped demo database.
//!
//! A library crate the binary in `src/bin/` is a one-line wrapper around.

pub mod opt;
pub mod run;
pub mod store;

pub use opt::IngestArgs;
pub use run::run;
pub use store::{SeedProgress, Store, StoreError};
