//! URL handling module for Delta-Ripple
//!
//! This module provides URL normalization, domain extraction, wildcard
//! matching, and the `DomainHandler` frontier that decides which addresses
//! belong to the crawl.

mod domain;
mod frontier;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use frontier::DomainHandler;
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;
