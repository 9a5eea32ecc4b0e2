// src/lib.rs

//! vodcrawl: adapter-driven catalog extraction for video aggregator sites.

pub mod capture;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod selector;
pub mod services;
pub mod utils;
