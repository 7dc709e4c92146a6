//! Sports broadcast link enrichment.
//!
//! Resolves the free-text channel labels of scraped match listings against a
//! channel registry and attaches the matching streaming links, grouped by
//! quality tier.

pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod model;
pub mod pipeline;
pub mod registry;

pub use error::{EnrichError, EnrichResult};
