// src/pipeline/validate.rs

//! Adapter directory validation.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::AdapterDefinition;
use crate::services::{adapter_files, load_definition, site_id};
use crate::utils::log;

/// Validation result for one adapter file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterCheck {
    pub site: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stages the adapter declares
    pub stages: Vec<&'static str>,
}

impl AdapterCheck {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Check every adapter file in `dir` without stopping at the first failure.
pub fn run_validate(dir: &Path) -> Result<Vec<AdapterCheck>> {
    log::header(&format!("Validating adapters in {}", dir.display()));

    let mut checks = Vec::new();
    for path in adapter_files(dir)? {
        let site = site_id(&path)?;
        let check = match load_definition(&path) {
            Ok(definition) => {
                let stages = declared_stages(&definition);
                log::sub_item(&format!("{site}: ok ({})", stages.join(", ")));
                AdapterCheck {
                    site,
                    path: path.display().to_string(),
                    error: None,
                    stages,
                }
            }
            Err(e) => {
                log::warn(&format!("{site}: {e}"));
                AdapterCheck {
                    site,
                    path: path.display().to_string(),
                    error: Some(e.to_string()),
                    stages: Vec::new(),
                }
            }
        };
        checks.push(check);
    }

    let invalid = checks.iter().filter(|c| !c.is_valid()).count();
    log::summary(
        "Validation",
        &[
            ("Adapters", checks.len().to_string()),
            ("Valid", (checks.len() - invalid).to_string()),
            ("Invalid", invalid.to_string()),
        ],
    );
    Ok(checks)
}

/// Stages a definition can serve.
pub fn declared_stages(definition: &AdapterDefinition) -> Vec<&'static str> {
    let mut stages = vec!["home", "filters"];
    if definition.category.is_some() {
        stages.push("category");
    }
    if definition.detail.is_some() {
        stages.push("detail");
    }
    if definition.play.is_some() {
        stages.push("play");
    }
    if definition.search.is_some() {
        stages.push("search");
    }
    stages
}
