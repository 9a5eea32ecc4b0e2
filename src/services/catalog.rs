// src/services/catalog.rs

//! Catalog pipeline.
//!
//! Runs the home, category, filters, detail, play and search stages for one
//! site. Every stage is independently invocable; [`CatalogPipeline::run`]
//! turns a failed invocation into an empty result plus a diagnostic so it
//! never affects sibling invocations.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use super::normalizer::{Normalizer, RawDetail, RawListing, clean_text};
use crate::capture::{Placeholder, TemplateVars, resolve_category_id};
use crate::error::{AppError, FetchKind, Result};
use crate::models::{
    AdapterDefinition, CatalogItem, Category, CrawlerConfig, DetailRecord, FilterDimension,
    HomePage, ListingRule, PlayEntry, PlayGroup, PlayListRule, PlaySource, SearchResult,
};
use crate::selector::{HtmlDocument, Scope, SelectorRule};
use crate::utils::http::Fetcher;
use crate::utils::url::{encode_component, encode_path_segment};

/// One stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    Home,
    Category {
        cate_id: String,
        filters: BTreeMap<String, String>,
        page: u32,
    },
    Filters {
        cate_id: String,
    },
    Detail {
        vid: String,
    },
    Play {
        play_id: String,
    },
    Search {
        query: String,
    },
}

impl StageRequest {
    /// First page of a category without filters.
    pub fn category(cate_id: impl Into<String>) -> Self {
        StageRequest::Category {
            cate_id: cate_id.into(),
            filters: BTreeMap::new(),
            page: 1,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            StageRequest::Home => "home",
            StageRequest::Category { .. } => "category",
            StageRequest::Filters { .. } => "filters",
            StageRequest::Detail { .. } => "detail",
            StageRequest::Play { .. } => "play",
            StageRequest::Search { .. } => "search",
        }
    }
}

/// Result payload of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    Home(HomePage),
    Items(Vec<CatalogItem>),
    Filters(Vec<FilterDimension>),
    Detail(Option<DetailRecord>),
    Play(Option<PlaySource>),
    Search(Vec<SearchResult>),
}

impl StageOutput {
    /// The empty result reported for a failed request.
    pub fn empty(request: &StageRequest) -> Self {
        match request {
            StageRequest::Home => StageOutput::Home(HomePage::default()),
            StageRequest::Category { .. } => StageOutput::Items(Vec::new()),
            StageRequest::Filters { .. } => StageOutput::Filters(Vec::new()),
            StageRequest::Detail { .. } => StageOutput::Detail(None),
            StageRequest::Play { .. } => StageOutput::Play(None),
            StageRequest::Search { .. } => StageOutput::Search(Vec::new()),
        }
    }
}

/// Outcome of one stage invocation.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub site: String,
    pub stage: &'static str,
    pub output: StageOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Stage runner for one site.
pub struct CatalogPipeline {
    site_id: String,
    adapter: Arc<AdapterDefinition>,
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlerConfig,
    throttle: Arc<Semaphore>,
}

impl CatalogPipeline {
    pub fn new(
        site_id: impl Into<String>,
        adapter: Arc<AdapterDefinition>,
        fetcher: Arc<dyn Fetcher>,
        settings: &CrawlerConfig,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            adapter,
            fetcher,
            throttle: Arc::new(Semaphore::new(settings.per_site_concurrency.max(1))),
            settings: settings.clone(),
        }
    }

    /// Share a request throttle with other pipelines of the same site.
    pub fn with_throttle(mut self, throttle: Arc<Semaphore>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn adapter(&self) -> &AdapterDefinition {
        &self.adapter
    }

    /// Execute any stage, isolating its failure.
    pub async fn run(&self, request: &StageRequest) -> StageReport {
        let result = match request {
            StageRequest::Home => self.home().await.map(StageOutput::Home),
            StageRequest::Category {
                cate_id,
                filters,
                page,
            } => self
                .category(cate_id, filters, *page)
                .await
                .map(StageOutput::Items),
            StageRequest::Filters { cate_id } => Ok(StageOutput::Filters(self.filters(cate_id))),
            StageRequest::Detail { vid } => {
                self.detail(vid).await.map(|d| StageOutput::Detail(Some(d)))
            }
            StageRequest::Play { play_id } => {
                self.play(play_id).await.map(|p| StageOutput::Play(Some(p)))
            }
            StageRequest::Search { query } => self.search(query).await.map(StageOutput::Search),
        };

        let stage = request.stage();
        match result {
            Ok(output) => StageReport {
                site: self.site_id.clone(),
                stage,
                output,
                error: None,
            },
            Err(error) => {
                log::warn!("[{}] {} stage failed: {}", self.site_id, stage, error);
                StageReport {
                    site: self.site_id.clone(),
                    stage,
                    output: StageOutput::empty(request),
                    error: Some(error.to_string()),
                }
            }
        }
    }

    /// Categories and featured items from the home page.
    pub async fn home(&self) -> Result<HomePage> {
        let adapter = &self.adapter;
        if adapter.categories.is_none() && adapter.home.is_none() {
            return Ok(HomePage {
                categories: self.manual_categories(),
                items: Vec::new(),
            });
        }

        let url = adapter.home_url.as_str();
        let body = self.fetch(url, self.user_agent()).await?;
        let html = parse_html(&body);
        let document = Scope::document(&html);

        let categories = match &adapter.categories {
            Some(_) => self.discover_categories(&document),
            None => self.manual_categories(),
        };
        let items = match &adapter.home {
            Some(listing) => self.catalog_items(listing, &document),
            None => Vec::new(),
        };

        log::info!(
            "[{}] home: {} categories, {} items",
            self.site_id,
            categories.len(),
            items.len()
        );
        Ok(HomePage { categories, items })
    }

    /// One page of a category listing.
    ///
    /// Filter values are substituted into the matching placeholders; a
    /// non-empty `cateId` filter replaces `cate_id`.
    pub async fn category(
        &self,
        cate_id: &str,
        filters: &BTreeMap<String, String>,
        page: u32,
    ) -> Result<Vec<CatalogItem>> {
        let endpoint = self
            .adapter
            .category
            .as_ref()
            .ok_or_else(|| self.unsupported("category"))?;

        let mut vars = TemplateVars::new();
        for (key, value) in filters {
            match key.parse::<Placeholder>() {
                Ok(placeholder) => vars.set(placeholder, encode_path_segment(value)),
                Err(_) => log::debug!("[{}] ignoring filter '{}'", self.site_id, key),
            }
        }
        let cate_id = filters
            .get(Placeholder::CateId.as_str())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .unwrap_or(cate_id);
        vars.set(Placeholder::CateId, encode_path_segment(cate_id));
        vars.set(Placeholder::CatePg, page.to_string());

        let url = endpoint.url.expand(&vars);
        let body = self.fetch(&url, self.user_agent()).await?;
        let html = parse_html(&body);
        let items = self.catalog_items(&endpoint.listing, &Scope::document(&html));

        log::debug!("[{}] {}: {} items", self.site_id, url, items.len());
        Ok(items)
    }

    /// Declared filter dimensions of a category bucket.
    pub fn filters(&self, cate_id: &str) -> Vec<FilterDimension> {
        self.adapter.filters_for(cate_id).to_vec()
    }

    /// Detail page of one title.
    pub async fn detail(&self, vid: &str) -> Result<DetailRecord> {
        let rule = self
            .adapter
            .detail
            .as_ref()
            .ok_or_else(|| self.unsupported("detail"))?;

        let url = rule
            .url
            .expand(&TemplateVars::new().with(Placeholder::Vid, vid));
        let body = self.fetch(&url, self.user_agent()).await?;
        let html = parse_html(&body);

        let root = rule
            .node
            .select(&Scope::document(&html))
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::selector(rule.node.path().source(), format!("no match in {url}"))
            })?;

        let raw = RawDetail {
            name: extract(&rule.name, &root),
            img: extract(&rule.img, &root),
            category: extract(&rule.category, &root),
            year: extract(&rule.year, &root),
            area: extract(&rule.area, &root),
            mark: extract(&rule.mark, &root),
            actors: extract(&rule.actor, &root),
            director: extract(&rule.director, &root),
            description: extract(&rule.description, &root),
        };
        let groups = play_groups(&rule.play_list, &root);

        Ok(self.normalizer().detail(vid, &raw, groups))
    }

    /// Fetch the play page of an episode for a playback resolver.
    pub async fn play(&self, play_id: &str) -> Result<PlaySource> {
        let rule = self
            .adapter
            .play
            .as_ref()
            .ok_or_else(|| self.unsupported("play"))?;

        let url = rule
            .url
            .expand(&TemplateVars::new().with(Placeholder::PlayUrl, play_id));
        let user_agent = rule
            .user_agent
            .as_deref()
            .or(self.adapter.user_agent.as_deref());
        let body = self
            .fetch(&url, user_agent.unwrap_or(&self.settings.user_agent))
            .await?;
        let body = String::from_utf8_lossy(&body).into_owned();

        Ok(PlaySource {
            url,
            user_agent: user_agent.map(str::to_string),
            body,
        })
    }

    /// Search the site. Without a declared search endpoint nothing is found.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let Some(endpoint) = &self.adapter.search else {
            return Ok(Vec::new());
        };

        let url = endpoint
            .url
            .expand(&TemplateVars::new().with(Placeholder::Wd, encode_component(query)));
        let body = self.fetch(&url, self.user_agent()).await?;

        let listing = &endpoint.listing;
        let raw = if listing.node.path().is_json() {
            let value = parse_json(&url, &body)?;
            raw_listing(listing, &Scope::json(&value))
        } else {
            let html = parse_html(&body);
            raw_listing(listing, &Scope::document(&html))
        };

        let normalizer = self.normalizer();
        let results: Vec<_> = raw
            .iter()
            .filter_map(|entry| normalizer.search_result(entry))
            .collect();
        log::debug!("[{}] search '{}': {} results", self.site_id, query, results.len());
        Ok(results)
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.adapter.home_url)
    }

    fn user_agent(&self) -> &str {
        self.adapter
            .user_agent
            .as_deref()
            .unwrap_or(&self.settings.user_agent)
    }

    fn unsupported(&self, stage: &'static str) -> AppError {
        AppError::Unsupported {
            site: self.site_id.clone(),
            stage,
        }
    }

    fn catalog_items(&self, listing: &ListingRule, scope: &Scope<'_>) -> Vec<CatalogItem> {
        let normalizer = self.normalizer();
        raw_listing(listing, scope)
            .iter()
            .filter_map(|entry| {
                let item = normalizer.catalog_item(entry);
                if item.is_none() {
                    log::debug!("[{}] skipping entry without id", self.site_id);
                }
                item
            })
            .collect()
    }

    /// Categories listed under `cateNode`, first occurrence of each id kept.
    fn discover_categories(&self, document: &Scope<'_>) -> Vec<Category> {
        let Some(rule) = &self.adapter.categories else {
            return Vec::new();
        };
        let id_capture = rule.id.as_ref().and_then(SelectorRule::capture);

        let mut seen = HashSet::new();
        let mut categories = Vec::new();
        for node in rule.node.select(document) {
            let Some(name) = clean_text(extract(&rule.name, &node).as_deref()) else {
                continue;
            };
            let raw_id = rule
                .id
                .as_ref()
                .and_then(|id| id.extract_raw(&node))
                .unwrap_or_default();
            let id = resolve_category_id(&name, &raw_id, &self.adapter.cate_manual, id_capture)
                .trim()
                .to_string();
            if id.is_empty() || !seen.insert(id.clone()) {
                continue;
            }
            categories.push(self.category_entry(id, name));
        }
        categories
    }

    fn manual_categories(&self) -> Vec<Category> {
        self.adapter
            .cate_manual
            .iter()
            .map(|(name, id)| self.category_entry(id.clone(), name.clone()))
            .collect()
    }

    fn category_entry(&self, id: String, name: String) -> Category {
        Category {
            filters: self.filters(&id),
            id,
            name,
        }
    }

    /// Fetch with throttle, deadline and retry on transient failures.
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url, user_agent).await {
                Err(error) if error.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = self.settings.retry_delay(attempt);
                    log::warn!(
                        "[{}] {} (retry {}/{} in {:?})",
                        self.site_id,
                        error,
                        attempt,
                        self.settings.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(&self, url: &str, user_agent: &str) -> Result<Vec<u8>> {
        let _permit = self
            .throttle
            .acquire()
            .await
            .map_err(|e| AppError::fetch(url, FetchKind::Other, e))?;

        if self.settings.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.request_delay_ms)).await;
        }

        let timeout = self.settings.timeout();
        log::debug!("[{}] GET {}", self.site_id, url);
        match tokio::time::timeout(timeout, self.fetcher.fetch(url, user_agent, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::fetch(
                url,
                FetchKind::Timeout,
                format!("no response within {timeout:?}"),
            )),
        }
    }
}

/// Invalid byte sequences become U+FFFD instead of failing the page.
fn parse_html(body: &[u8]) -> HtmlDocument {
    HtmlDocument::parse(&String::from_utf8_lossy(body))
}

fn parse_json(url: &str, body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| AppError::parse(url, e))
}

fn extract(rule: &Option<SelectorRule>, scope: &Scope<'_>) -> Option<String> {
    rule.as_ref()?.extract(scope)
}

fn raw_listing(listing: &ListingRule, scope: &Scope<'_>) -> Vec<RawListing> {
    listing
        .node
        .select(scope)
        .iter()
        .map(|item| RawListing {
            id: extract(&listing.id, item),
            name: extract(&listing.name, item),
            img: extract(&listing.img, item),
            mark: extract(&listing.mark, item),
        })
        .collect()
}

/// Pair group names with entry groups by index.
///
/// Groups without entries are dropped together with their name; a group
/// without a name is called `Source N`.
fn play_groups(rule: &PlayListRule, root: &Scope<'_>) -> Vec<PlayGroup> {
    let names: Vec<Option<String>> = match &rule.from_node {
        Some(from_node) => from_node
            .select(root)
            .iter()
            .map(|node| clean_text(extract(&rule.from_name, node).as_deref()))
            .collect(),
        None => Vec::new(),
    };
    let Some(url_node) = &rule.url_node else {
        return Vec::new();
    };

    url_node
        .select(root)
        .iter()
        .enumerate()
        .filter_map(|(index, group)| {
            let nodes = match &rule.url_sub_node {
                Some(sub_node) => sub_node.select(group),
                None => vec![group.clone()],
            };
            let entries: Vec<PlayEntry> = nodes
                .iter()
                .filter_map(|node| {
                    Some(PlayEntry {
                        play_id: extract(&rule.url_id, node)?.trim().to_string(),
                        label: clean_text(extract(&rule.url_name, node).as_deref()),
                    })
                })
                .collect();
            if entries.is_empty() {
                return None;
            }

            let name = names
                .get(index)
                .cloned()
                .flatten()
                .unwrap_or_else(|| format!("Source {}", index + 1));
            Some(PlayGroup { name, entries })
        })
        .collect()
}
