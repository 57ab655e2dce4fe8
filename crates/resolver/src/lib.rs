//! Multi-strategy fuzzy resolution over the DART corp-code master list
//! (spec.md §4.8): exact ticker, exact registration code, exact name,
//! then Korean-jamo fuzzy matching.
//!
//! Has no corpus analogue — the jamo decomposition and edit-distance
//! similarity are implemented directly from spec.md's prose contract.

pub mod index;
pub mod jamo;
pub mod mapping;
pub mod persistence;
pub mod resolver;

pub use mapping::{CorpMapping, MatchType, ResolutionResult};
pub use persistence::PersistenceError;
pub use resolver::CorpCodeResolver;
