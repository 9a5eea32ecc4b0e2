// src/services/normalizer.rs

//! Maps raw selector output onto the canonical records.

use crate::models::{CatalogItem, DetailRecord, PlayGroup, SearchResult};
use crate::utils::url;

/// Raw fields extracted for one listing entry.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub id: Option<String>,
    pub name: Option<String>,
    pub img: Option<String>,
    pub mark: Option<String>,
}

/// Raw fields extracted from a detail page.
#[derive(Debug, Clone, Default)]
pub struct RawDetail {
    pub name: Option<String>,
    pub img: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub area: Option<String>,
    pub mark: Option<String>,
    pub actors: Option<String>,
    pub director: Option<String>,
    pub description: Option<String>,
}

/// Collapse runs of whitespace and trim; blank input becomes `None`.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let text = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Record builder for one site.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    home_url: &'a str,
}

impl<'a> Normalizer<'a> {
    pub fn new(home_url: &'a str) -> Self {
        Self { home_url }
    }

    /// Trimmed image URL. Root-relative and scheme-relative paths are resolved
    /// against the site's home URL; anything else is kept verbatim.
    pub fn image(&self, raw: Option<&str>) -> Option<String> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with('/') {
            return Some(url::resolve(self.home_url, raw));
        }
        Some(raw.to_string())
    }

    /// Listing entry, or `None` when the entry has no id.
    pub fn catalog_item(&self, raw: &RawListing) -> Option<CatalogItem> {
        Some(CatalogItem {
            id: clean_id(raw.id.as_deref())?,
            title: clean_text(raw.name.as_deref()),
            image_url: self.image(raw.img.as_deref()),
            mark: clean_text(raw.mark.as_deref()),
        })
    }

    /// Search hit, or `None` when the hit has no id.
    pub fn search_result(&self, raw: &RawListing) -> Option<SearchResult> {
        self.catalog_item(raw).map(|item| SearchResult {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            mark: item.mark,
        })
    }

    pub fn detail(&self, id: &str, raw: &RawDetail, play_groups: Vec<PlayGroup>) -> DetailRecord {
        DetailRecord {
            id: id.to_string(),
            title: clean_text(raw.name.as_deref()),
            image_url: self.image(raw.img.as_deref()),
            mark: clean_text(raw.mark.as_deref()),
            category: clean_text(raw.category.as_deref()),
            year: clean_text(raw.year.as_deref()),
            area: clean_text(raw.area.as_deref()),
            actors: clean_text(raw.actors.as_deref()),
            director: clean_text(raw.director.as_deref()),
            description: clean_text(raw.description.as_deref()),
            play_groups,
        }
    }
}

fn clean_id(raw: Option<&str>) -> Option<String> {
    let id = raw?.trim();
    (!id.is_empty()).then(|| id.to_string())
}
