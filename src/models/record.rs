// src/models/record.rs

//! Canonical records emitted by the catalog pipeline.

use serde::{Deserialize, Serialize};

use super::FilterDimension;

/// A catalog category with the filter dimensions of its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterDimension>,
}

/// An item from the home page or a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
}

/// An item from a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
}

/// Result of the home stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomePage {
    pub categories: Vec<Category>,
    pub items: Vec<CatalogItem>,
}

/// A playable episode entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub play_id: String,
}

/// A named bundle of episode entries (one play source / line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayGroup {
    pub name: String,
    pub entries: Vec<PlayEntry>,
}

/// Full detail of one title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub mark: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub area: Option<String>,
    pub actors: Option<String>,
    pub director: Option<String>,
    pub description: Option<String>,
    pub play_groups: Vec<PlayGroup>,
}

/// Outcome of the play stage, handed to a playback resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub body: String,
}

/// Adapter-independent output record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_groups: Option<Vec<PlayGroup>>,
}

impl From<CatalogItem> for VodRecord {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            mark: item.mark,
            ..Self::default()
        }
    }
}

impl From<SearchResult> for VodRecord {
    fn from(item: SearchResult) -> Self {
        Self {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            mark: item.mark,
            ..Self::default()
        }
    }
}

impl From<DetailRecord> for VodRecord {
    fn from(detail: DetailRecord) -> Self {
        Self {
            id: detail.id,
            title: detail.title,
            image_url: detail.image_url,
            mark: detail.mark,
            category: detail.category,
            year: detail.year,
            area: detail.area,
            actors: detail.actors,
            director: detail.director,
            description: detail.description,
            play_groups: (!detail.play_groups.is_empty()).then_some(detail.play_groups),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_result_omits_absent_fields() {
        let record = VodRecord::from(SearchResult {
            id: "1".into(),
            title: Some("A".into()),
            image_url: Some("p1".into()),
            mark: None,
        });
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": "1", "title": "A", "imageUrl": "p1"})
        );
    }

    #[test]
    fn test_detail_groups_serialize_camel_case() {
        let record = VodRecord::from(DetailRecord {
            id: "9".into(),
            year: Some("2022".into()),
            play_groups: vec![PlayGroup {
                name: "线路一".into(),
                entries: vec![PlayEntry {
                    label: Some("第1集".into()),
                    play_id: "9-1-1".into(),
                }],
            }],
            ..DetailRecord::default()
        });
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "id": "9",
                "year": "2022",
                "playGroups": [{"name": "线路一", "entries": [{"label": "第1集", "playId": "9-1-1"}]}]
            })
        );
    }

    #[test]
    fn test_detail_without_groups_omits_field() {
        let record = VodRecord::from(DetailRecord {
            id: "9".into(),
            ..DetailRecord::default()
        });
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"id": "9"}));
    }
}
