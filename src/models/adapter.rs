// src/models/adapter.rs

//! Compiled adapter definitions.
//!
//! An adapter file is a flat JSON object of selector paths, capture regexes
//! (the same key with an `R` suffix), URL templates and filter tables. Every
//! path, regex and template is compiled here, so a definition that loads is
//! usable for the lifetime of the process.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::FilterDimension;
use crate::capture::{Capture, Template};
use crate::error::{AppError, Result};
use crate::selector::{Mode, SelectorRule};

/// The node/name/id/img/mark rule family shared by the listing stages.
#[derive(Debug, Clone)]
pub struct ListingRule {
    pub node: SelectorRule,
    pub name: Option<SelectorRule>,
    pub id: Option<SelectorRule>,
    pub img: Option<SelectorRule>,
    pub mark: Option<SelectorRule>,
}

impl ListingRule {
    /// Compile `{prefix}Node`, `{prefix}Name`, ... with their `R` captures.
    ///
    /// A JSON node switches every sub-field to a JSON key path.
    fn compile(fields: &Fields<'_>, prefix: &str) -> Result<Option<Self>> {
        let node = fields.rule(&format!("{prefix}Node"), Mode::Detect)?;
        let mode = match &node {
            Some(node) if node.path().is_json() => Mode::Json,
            _ => Mode::Detect,
        };

        let name = fields.rule(&format!("{prefix}Name"), mode)?;
        let id = fields.rule(&format!("{prefix}Id"), mode)?;
        let img = fields.rule(&format!("{prefix}Img"), mode)?;
        let mark = fields.rule(&format!("{prefix}Mark"), mode)?;

        Ok(node.map(|node| Self {
            node,
            name,
            id,
            img,
            mark,
        }))
    }
}

/// A listing reached through a URL template (category pages, search).
#[derive(Debug, Clone)]
pub struct ListingEndpoint {
    pub url: Template,
    pub listing: ListingRule,
}

/// Category discovery on the home page.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub node: SelectorRule,
    pub name: Option<SelectorRule>,
    pub id: Option<SelectorRule>,
}

/// Detail page fields, evaluated relative to the `dtNode` match.
#[derive(Debug, Clone)]
pub struct DetailRule {
    pub url: Template,
    pub node: SelectorRule,
    pub name: Option<SelectorRule>,
    pub img: Option<SelectorRule>,
    pub category: Option<SelectorRule>,
    pub year: Option<SelectorRule>,
    pub area: Option<SelectorRule>,
    pub mark: Option<SelectorRule>,
    pub actor: Option<SelectorRule>,
    pub director: Option<SelectorRule>,
    pub description: Option<SelectorRule>,
    pub play_list: PlayListRule,
}

/// Play-source groups on the detail page.
#[derive(Debug, Clone, Default)]
pub struct PlayListRule {
    /// One node per group name
    pub from_node: Option<SelectorRule>,
    pub from_name: Option<SelectorRule>,
    /// One node per group of entries
    pub url_node: Option<SelectorRule>,
    /// One node per entry, relative to a group node
    pub url_sub_node: Option<SelectorRule>,
    pub url_id: Option<SelectorRule>,
    pub url_name: Option<SelectorRule>,
}

/// Play page request.
#[derive(Debug, Clone)]
pub struct PlayRule {
    pub url: Template,
    pub user_agent: Option<String>,
}

/// A compiled, immutable adapter definition.
#[derive(Debug, Clone)]
pub struct AdapterDefinition {
    pub author: Option<String>,
    pub user_agent: Option<String>,
    pub home_url: String,
    pub categories: Option<CategoryRule>,
    /// Category display name to id, in declaration order
    pub cate_manual: Vec<(String, String)>,
    pub home: Option<ListingRule>,
    pub category: Option<ListingEndpoint>,
    pub detail: Option<DetailRule>,
    pub play: Option<PlayRule>,
    pub search: Option<ListingEndpoint>,
    filters: Vec<(String, Vec<FilterDimension>)>,
}

impl AdapterDefinition {
    /// Decode and compile an adapter file.
    ///
    /// Full-line `//` comments are removed before decoding; unknown keys are
    /// ignored.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| AppError::config("adapter", e))?;
        let text = strip_comments(text.trim_start_matches('\u{feff}'));

        match serde_json::from_str(&text).map_err(|e| AppError::config("adapter", e))? {
            Value::Object(map) => Self::from_map(&map),
            _ => Err(AppError::config("adapter", "expected a JSON object")),
        }
    }

    /// Compile an already decoded adapter object.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let fields = Fields(map);

        let home_url = fields
            .optional("homeUrl")?
            .ok_or_else(|| AppError::config("homeUrl", "is required"))?;

        let cate_name = fields.rule("cateName", Mode::Detect)?;
        let cate_id = fields.rule("cateId", Mode::Detect)?;
        let categories = fields
            .rule("cateNode", Mode::Detect)?
            .map(|node| CategoryRule {
                node,
                name: cate_name,
                id: cate_id,
            });

        let home = ListingRule::compile(&fields, "homeVod")?;

        let category = endpoint(
            fields.template("cateUrl")?,
            ListingRule::compile(&fields, "cateVod")?,
            "cateVodNode",
            "cateUrl",
        )?;

        let search = endpoint(
            fields.template("searchUrl")?,
            ListingRule::compile(&fields, "scVod")?,
            "scVodNode",
            "searchUrl",
        )?;

        let detail = Self::detail(&fields)?;

        let play = fields
            .template("playUrl")?
            .map(|url| -> Result<PlayRule> {
                Ok(PlayRule {
                    url,
                    user_agent: fields.optional("playUa")?,
                })
            })
            .transpose()?;

        Ok(Self {
            author: fields.optional("author")?,
            user_agent: fields.optional("ua")?,
            home_url,
            categories,
            cate_manual: cate_manual(map)?,
            home,
            category,
            detail,
            play,
            search,
            filters: filter_table(map)?,
        })
    }

    fn detail(fields: &Fields<'_>) -> Result<Option<DetailRule>> {
        let url = fields.template("dtUrl")?;
        let node = fields.rule("dtNode", Mode::Detect)?;
        let rule = |key: &str| fields.rule(key, Mode::Detect);

        let name = rule("dtName")?;
        let img = rule("dtImg")?;
        let category = rule("dtCate")?;
        let year = rule("dtYear")?;
        let area = rule("dtArea")?;
        let mark = rule("dtMark")?;
        let actor = rule("dtActor")?;
        let director = rule("dtDirector")?;
        let description = rule("dtDesc")?;
        let play_list = PlayListRule {
            from_node: rule("dtFromNode")?,
            from_name: rule("dtFromName")?,
            url_node: rule("dtUrlNode")?,
            url_sub_node: rule("dtUrlSubNode")?,
            url_id: rule("dtUrlId")?,
            url_name: rule("dtUrlName")?,
        };

        match (url, node) {
            (None, _) => Ok(None),
            (Some(_), None) => Err(AppError::config("dtNode", "required when dtUrl is declared")),
            (Some(url), Some(node)) => Ok(Some(DetailRule {
                url,
                node,
                name,
                img,
                category,
                year,
                area,
                mark,
                actor,
                director,
                description,
                play_list,
            })),
        }
    }

    /// Filter dimensions of a category bucket, in declared order.
    pub fn filters_for(&self, bucket: &str) -> &[FilterDimension] {
        self.filters
            .iter()
            .find(|(key, _)| key == bucket)
            .map(|(_, dims)| dims.as_slice())
            .unwrap_or_default()
    }

    /// Declared filter buckets, in declared order.
    pub fn filter_buckets(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(key, _)| key.as_str())
    }
}

fn endpoint(
    url: Option<Template>,
    listing: Option<ListingRule>,
    node_field: &str,
    url_field: &str,
) -> Result<Option<ListingEndpoint>> {
    match (url, listing) {
        (None, _) => Ok(None),
        (Some(_), None) => Err(AppError::config(
            node_field,
            format!("required when {url_field} is declared"),
        )),
        (Some(url), Some(listing)) => Ok(Some(ListingEndpoint { url, listing })),
    }
}

/// Blank out full-line `//` comments, keeping line numbers intact.
fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cate_manual(map: &Map<String, Value>) -> Result<Vec<(String, String)>> {
    match map.get("cateManual") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(name, id)| match id {
                Value::String(id) => Ok((name.clone(), id.clone())),
                other => Err(AppError::config(
                    "cateManual",
                    format!("value for '{name}' must be a string, found {}", kind(other)),
                )),
            })
            .collect(),
        Some(other) => Err(AppError::config(
            "cateManual",
            format!("expected an object, found {}", kind(other)),
        )),
    }
}

fn filter_table(map: &Map<String, Value>) -> Result<Vec<(String, Vec<FilterDimension>)>> {
    match map.get("filter") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(buckets)) => buckets
            .iter()
            .map(|(bucket, dims)| {
                if bucket.trim().is_empty() {
                    return Err(AppError::config("filter", "bucket key is empty"));
                }
                let dims = Vec::<FilterDimension>::deserialize(dims)
                    .map_err(|e| AppError::config(format!("filter.{bucket}"), e))?;
                Ok((bucket.clone(), dims))
            })
            .collect(),
        Some(other) => Err(AppError::config(
            "filter",
            format!("expected an object, found {}", kind(other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed access to the flat adapter object.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    /// Raw string value; absent and null read as empty.
    fn text(&self, key: &str) -> Result<&str> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(""),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(AppError::config(
                key,
                format!("expected a string, found {}", kind(other)),
            )),
        }
    }

    fn optional(&self, key: &str) -> Result<Option<String>> {
        let value = self.text(key)?.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn rule(&self, key: &str, mode: Mode) -> Result<Option<SelectorRule>> {
        let capture_key = format!("{key}R");
        let capture = Capture::compile(&capture_key, self.text(&capture_key)?)?;
        SelectorRule::compile(key, self.text(key)?, capture, mode)
    }

    fn template(&self, key: &str) -> Result<Option<Template>> {
        self.optional(key)?
            .map(|source| Template::parse(key, &source))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JUMI: &[u8] = include_bytes!("../../adapters/jumi.json");
    const SOGOU: &[u8] = include_bytes!("../../adapters/sogou.json");

    fn load(json: &str) -> Result<AdapterDefinition> {
        AdapterDefinition::from_slice(json.as_bytes())
    }

    #[test]
    fn test_bundled_adapters_load() {
        let jumi = AdapterDefinition::from_slice(JUMI).unwrap();
        assert_eq!(jumi.home_url, "https://jumi.tv");
        assert!(jumi.categories.is_some());
        assert!(jumi.detail.is_some());
        assert!(jumi.user_agent.is_some());

        let sogou = AdapterDefinition::from_slice(SOGOU).unwrap();
        assert!(sogou.categories.is_none());
        assert_eq!(sogou.cate_manual.len(), 5);
        assert_eq!(sogou.cate_manual[0], ("电影".to_string(), "dianying".to_string()));
        assert_eq!(sogou.cate_manual[4].1, "bilibili");
        assert!(sogou.user_agent.is_none());
    }

    #[test]
    fn test_json_search_node_switches_sub_fields() {
        let sogou = AdapterDefinition::from_slice(SOGOU).unwrap();
        let search = sogou.search.unwrap();
        assert!(search.listing.node.path().is_json());
        assert!(search.listing.name.unwrap().path().is_json());
        assert!(search.listing.mark.is_none());

        let home = sogou.home.unwrap();
        assert!(!home.node.path().is_json());
    }

    #[test]
    fn test_comment_lines_are_stripped() {
        let adapter = load(
            "{\n  // \"cateNode\": \"//ul\",\n  \"homeUrl\": \"https://s\",\n  \"dtNode\": \"//body\"\n}",
        )
        .unwrap();
        assert!(adapter.categories.is_none());
        assert_eq!(adapter.home_url, "https://s");
    }

    #[test]
    fn test_filters_keep_declared_order() {
        let jumi = AdapterDefinition::from_slice(JUMI).unwrap();
        let keys: Vec<_> = jumi.filters_for("1").iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["cateId", "area", "year", "by"]);
        assert_eq!(jumi.filters_for("1")[3].options[0].value, "time");
        assert!(jumi.filters_for("missing").is_empty());
        assert_eq!(jumi.filter_buckets().next(), Some("1"));
    }

    #[test]
    fn test_home_url_required() {
        let err = load(r#"{"author": "x"}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "homeUrl"));
    }

    #[test]
    fn test_regex_without_group_rejected() {
        let err = load(r#"{"homeUrl": "https://s", "homeVodNode": "//li", "homeVodId": "/a/@href", "homeVodIdR": "/vod/\\w+.html"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "homeVodIdR"));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = load(r#"{"homeUrl": "https://s", "dtUrl": "https://s/{id}.html", "dtNode": "//body"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "dtUrl"));
    }

    #[test]
    fn test_stage_urls_require_nodes() {
        let err = load(r#"{"homeUrl": "https://s", "dtUrl": "https://s/{vid}.html"}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "dtNode"));

        let err = load(r#"{"homeUrl": "https://s", "searchUrl": "https://s?wd={wd}"}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "scVodNode"));
    }

    #[test]
    fn test_invalid_path_rejected() {
        let err = load(r#"{"homeUrl": "https://s", "homeVodNode": "//div[@class="}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "homeVodNode"));
    }

    #[test]
    fn test_malformed_tables_rejected() {
        let err = load(r#"{"homeUrl": "https://s", "cateManual": {"电影": 1}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "cateManual"));

        let err = load(r#"{"homeUrl": "https://s", "cateManual": ["电影"]}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "cateManual"));

        let err = load(r#"{"homeUrl": "https://s", "filter": {"1": {"key": "by"}}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "filter.1"));

        let err = load(r#"{"homeUrl": "https://s", "filter": {"": []}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "filter"));

        let err = load(r#"{"homeUrl": "https://s", "filter": {"1": [{"key": "by", "name": "排序", "value": [{"n": "时间"}]}]}}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "filter.1"));
    }

    #[test]
    fn test_ignored_keys_accept_any_shape() {
        let adapter = load(r#"{"homeUrl": "https://s", "dcShow2Vip": {}, "dcVipFlag": "true", "pCfgJs": "x"}"#);
        assert!(adapter.is_ok());
    }

    #[test]
    fn test_play_user_agent() {
        let adapter = load(r#"{"homeUrl": "https://s", "playUrl": "https://s/play/{playUrl}.html", "playUa": "okhttp/3.12"}"#)
            .unwrap();
        let play = adapter.play.unwrap();
        assert_eq!(play.user_agent.as_deref(), Some("okhttp/3.12"));
        assert!(adapter.detail.is_none());
        assert!(adapter.search.is_none());
    }
}
