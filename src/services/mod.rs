//! Service layer for the extraction engine.
//!
//! This module contains the business logic for:
//! - Adapter loading and lookup (`AdapterRegistry`)
//! - Stage execution for one site (`CatalogPipeline`)
//! - Record normalization (`Normalizer`)

mod catalog;
pub mod normalizer;
mod registry;

pub use catalog::{CatalogPipeline, StageOutput, StageReport, StageRequest};
pub use normalizer::Normalizer;
pub use registry::{AdapterRegistry, RegistryBuilder, adapter_files, load_definition, site_id};

#[cfg(test)]
pub(crate) use catalog::fixtures;
