// src/services/registry.rs

//! Adapter registry.
//!
//! Definitions are loaded and validated up front through [`RegistryBuilder`];
//! the finished [`AdapterRegistry`] is read-only and hands out shared
//! `Arc<AdapterDefinition>` handles.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::AdapterDefinition;

/// File extensions recognised as adapter definitions.
const ADAPTER_EXTENSIONS: [&str; 2] = ["json", "js"];

/// Collects adapter definitions before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    adapters: BTreeMap<String, Arc<AdapterDefinition>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled definition. A site id can only be registered once.
    pub fn insert(
        &mut self,
        site_id: impl Into<String>,
        definition: AdapterDefinition,
    ) -> Result<&mut Self> {
        let site_id = site_id.into();
        if site_id.trim().is_empty() {
            return Err(AppError::config("site", "site identifier is empty"));
        }
        if self.adapters.contains_key(&site_id) {
            return Err(AppError::config(
                "site",
                format!("duplicate adapter for site '{site_id}'"),
            ));
        }
        self.adapters.insert(site_id, Arc::new(definition));
        Ok(self)
    }

    /// Load one adapter file, keyed by its file stem.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let site_id = site_id(path)?;
        let definition = load_definition(path)?;
        log::debug!("Loaded adapter '{}' from {:?}", site_id, path);
        self.insert(site_id, definition)
    }

    /// Load every adapter file in `dir`.
    ///
    /// The first invalid definition aborts the load.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<&mut Self> {
        for path in adapter_files(dir.as_ref())? {
            self.load_file(&path)?;
        }
        Ok(self)
    }

    pub fn build(self) -> AdapterRegistry {
        AdapterRegistry {
            adapters: self.adapters,
        }
    }
}

/// Immutable site id to definition map.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<AdapterDefinition>>,
}

impl AdapterRegistry {
    /// Build a registry from every adapter file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        builder.load_dir(dir)?;
        Ok(builder.build())
    }

    pub fn get(&self, site_id: &str) -> Result<Arc<AdapterDefinition>> {
        self.adapters
            .get(site_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(site_id.to_string()))
    }

    /// Registered site ids, sorted.
    pub fn sites(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Adapter files in `dir`, sorted by path.
pub fn adapter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_adapter = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ADAPTER_EXTENSIONS.contains(&ext));
        if is_adapter {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read and compile one adapter file, prefixing config errors with the path.
pub fn load_definition(path: &Path) -> Result<AdapterDefinition> {
    let bytes = fs::read(path)?;
    AdapterDefinition::from_slice(&bytes).map_err(|e| match e {
        AppError::Config { field, message } => AppError::Config {
            field: format!("{}: {field}", path.display()),
            message,
        },
        other => other,
    })
}

/// Site id for an adapter file: its file stem.
pub fn site_id(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::config("site", format!("no file stem in {:?}", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JUMI: &str = include_str!("../../adapters/jumi.json");
    const SOGOU: &str = include_str!("../../adapters/sogou.json");

    fn adapter_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_dir_keys_by_stem() {
        let dir = adapter_dir(&[
            ("sogou.json", SOGOU),
            ("jumi.js", JUMI),
            ("notes.txt", "not an adapter"),
        ]);
        let registry = AdapterRegistry::from_dir(dir.path()).unwrap();

        assert_eq!(registry.sites(), vec!["jumi", "sogou"]);
        assert_eq!(registry.get("jumi").unwrap().home_url, "https://jumi.tv");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_site_is_not_found() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("nope"), Err(AppError::NotFound(ref s)) if s == "nope"));
    }

    #[test]
    fn test_invalid_adapter_fails_load() {
        let dir = adapter_dir(&[
            ("good.json", SOGOU),
            ("bad.json", r#"{"homeUrl": "https://s", "homeVodNode": "//li", "homeVodIdR": "no group"}"#),
        ]);
        let err = AdapterRegistry::from_dir(dir.path()).unwrap_err();
        match err {
            AppError::Config { field, .. } => {
                assert!(field.contains("bad.json"));
                assert!(field.ends_with("homeVodIdR"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_site_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .insert("sogou", AdapterDefinition::from_slice(SOGOU.as_bytes()).unwrap())
            .unwrap();
        let err = builder
            .insert("sogou", AdapterDefinition::from_slice(SOGOU.as_bytes()).unwrap())
            .unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_shared_handles() {
        let mut builder = RegistryBuilder::new();
        builder
            .insert("sogou", AdapterDefinition::from_slice(SOGOU.as_bytes()).unwrap())
            .unwrap();
        let registry = builder.build();
        let a = registry.get("sogou").unwrap();
        let b = registry.get("sogou").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
