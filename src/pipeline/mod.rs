//! Pipeline entry points for engine operations.
//!
//! - `run_requests`: Drive independent stage invocations on a worker pool
//! - `crawl_site`: Home, category listings and details for one site
//! - `run_validate`: Check every adapter file in a directory

pub mod crawl;
pub mod validate;

pub use crawl::{CategoryListing, CrawlOptions, CrawlOutcome, crawl_site, run_requests};
pub use validate::{AdapterCheck, run_validate};
