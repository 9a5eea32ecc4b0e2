// src/models/mod.rs

//! Domain models for the extraction engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod adapter;
mod config;
mod filter;
mod record;

// Re-export all public types
pub use adapter::{
    AdapterDefinition, CategoryRule, DetailRule, ListingEndpoint, ListingRule, PlayListRule,
    PlayRule,
};
pub use config::{AdapterConfig, Config, CrawlerConfig, LoggingConfig};
pub use filter::{FilterDimension, FilterOption};
pub use record::{
    CatalogItem, Category, DetailRecord, HomePage, PlayEntry, PlayGroup, PlaySource,
    SearchResult, VodRecord,
};
