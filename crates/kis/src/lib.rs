//! KIS (한국투자증권, Korea Investment & Securities) Open API adapter:
//! the Quotes provider client and the OAuth2 bearer manager it alone
//! needs (spec.md §4.5 "OAuth Manager", §4.6 "Quotes client").

pub mod client;
pub mod error;
pub mod oauth;

pub use client::KisClient;
pub use oauth::{Environment, OAuthManager};
