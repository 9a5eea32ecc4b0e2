// src/capture/template.rs

//! URL templates with `{name}` placeholders.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// A placeholder name an adapter template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    CateId,
    Area,
    By,
    CatePg,
    Year,
    Vid,
    PlayUrl,
    Wd,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::CateId,
        Placeholder::Area,
        Placeholder::By,
        Placeholder::CatePg,
        Placeholder::Year,
        Placeholder::Vid,
        Placeholder::PlayUrl,
        Placeholder::Wd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Placeholder::CateId => "cateId",
            Placeholder::Area => "area",
            Placeholder::By => "by",
            Placeholder::CatePg => "catePg",
            Placeholder::Year => "year",
            Placeholder::Vid => "vid",
            Placeholder::PlayUrl => "playUrl",
            Placeholder::Wd => "wd",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placeholder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Placeholder::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown placeholder '{{{s}}}'"))
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars(HashMap<Placeholder, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: Placeholder, value: impl Into<String>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    pub fn set(&mut self, name: Placeholder, value: impl Into<String>) {
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: Placeholder) -> Option<&str> {
        self.0.get(&name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Var(Placeholder),
}

/// A compiled URL template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    /// Compile the template declared for `field`.
    ///
    /// A `{` without a closing `}` is kept as literal text.
    pub fn parse(field: &str, source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let name = &rest[open + 1..open + close];
            let placeholder = name
                .parse::<Placeholder>()
                .map_err(|e| AppError::config(field, e))?;

            text.push_str(&rest[..open]);
            if !text.is_empty() {
                parts.push(Part::Text(std::mem::take(&mut text)));
            }
            parts.push(Part::Var(placeholder));
            rest = &rest[open + close + 1..];
        }

        text.push_str(rest);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholders referenced by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.parts.iter().filter_map(|part| match part {
            Part::Var(p) => Some(*p),
            Part::Text(_) => None,
        })
    }

    /// Substitute every placeholder; absent values expand to an empty string.
    pub fn expand(&self, vars: &TemplateVars) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Var(name) => out.push_str(vars.get(*name).unwrap_or_default()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_category_url() {
        let template = Template::parse(
            "cateUrl",
            "https://s/show/{cateId}/area/{area}/by/{by}/page/{catePg}/year/{year}.html",
        )
        .unwrap();
        let vars = TemplateVars::new()
            .with(Placeholder::CateId, "6")
            .with(Placeholder::Area, "")
            .with(Placeholder::By, "time")
            .with(Placeholder::CatePg, "1")
            .with(Placeholder::Year, "2022");

        assert_eq!(
            template.expand(&vars),
            "https://s/show/6/area//by/time/page/1/year/2022.html"
        );
    }

    #[test]
    fn test_missing_values_expand_empty() {
        let template = Template::parse("searchUrl", "https://s/search?wd={wd}&p={catePg}").unwrap();
        assert_eq!(
            template.expand(&TemplateVars::new().with(Placeholder::Wd, "abc")),
            "https://s/search?wd=abc&p="
        );
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = Template::parse("dtUrl", "https://s/{vodId}.html").unwrap_err();
        assert!(matches!(err, AppError::Config { ref field, .. } if field == "dtUrl"));
    }

    #[test]
    fn test_placeholders_listed() {
        let template = Template::parse("playUrl", "{playUrl}").unwrap();
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec![Placeholder::PlayUrl]);
        assert_eq!(template.expand(&TemplateVars::new().with(Placeholder::PlayUrl, "https://s/p/1.html")), "https://s/p/1.html");
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let template = Template::parse("cateUrl", "https://s/{cateId}/{oops").unwrap();
        assert_eq!(
            template.expand(&TemplateVars::new().with(Placeholder::CateId, "1")),
            "https://s/1/{oops"
        );
    }
}
