// src/selector/mod.rs

//! Selector engine.
//!
//! A [`SelectorRule`] pairs a compiled path with an optional capture regex.
//! The path mode (structural or JSON) is fixed when the rule is compiled, so
//! evaluation is a plain dispatch on [`PathExpr`].

mod document;
pub mod json;
pub mod structural;

use std::borrow::Cow;

use serde_json::Value;
use sxd_xpath::nodeset::Node;

use crate::capture::Capture;
use crate::error::{AppError, Result};

pub use document::HtmlDocument;
pub use json::JsonPath;
pub use structural::StructuralPath;

/// Marker that switches a rule to JSON mode.
pub const JSON_PREFIX: &str = "json:";

/// Something a rule can be evaluated against.
#[derive(Debug, Clone)]
pub enum Scope<'a> {
    Html(Node<'a>),
    Json(Cow<'a, Value>),
}

impl<'a> Scope<'a> {
    /// Scope covering a whole HTML document.
    pub fn document(document: &'a HtmlDocument) -> Self {
        Scope::Html(document.root())
    }

    /// Scope covering a decoded JSON body.
    pub fn json(value: &'a Value) -> Self {
        Scope::Json(Cow::Borrowed(value))
    }
}

/// How the path of a rule should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// JSON when the source starts with `json:`, structural otherwise
    Detect,
    /// Always a JSON key path (`json:` prefix optional)
    Json,
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub enum PathExpr {
    Structural(StructuralPath),
    Json(JsonPath),
}

impl PathExpr {
    pub fn is_json(&self) -> bool {
        matches!(self, PathExpr::Json(_))
    }

    pub fn source(&self) -> &str {
        match self {
            PathExpr::Structural(path) => path.source(),
            PathExpr::Json(path) => path.source(),
        }
    }
}

/// A compiled selector rule.
#[derive(Debug, Clone)]
pub struct SelectorRule {
    field: String,
    path: PathExpr,
    capture: Option<Capture>,
}

impl SelectorRule {
    /// Compile `source` for the named adapter field.
    ///
    /// Returns `Ok(None)` for an empty source: the field is not declared.
    pub fn compile(
        field: &str,
        source: &str,
        capture: Option<Capture>,
        mode: Mode,
    ) -> Result<Option<Self>> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(None);
        }

        let json = |path: &str| {
            JsonPath::parse(path)
                .map(PathExpr::Json)
                .map_err(|e| AppError::config(field, e))
        };
        let path = match (mode, source.strip_prefix(JSON_PREFIX)) {
            (_, Some(rest)) => json(rest)?,
            (Mode::Json, None) => json(source)?,
            (Mode::Detect, None) => PathExpr::Structural(
                StructuralPath::compile(source).map_err(|e| AppError::config(field, e))?,
            ),
        };

        Ok(Some(Self {
            field: field.to_string(),
            path,
            capture,
        }))
    }

    /// Adapter field this rule was compiled from.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn path(&self) -> &PathExpr {
        &self.path
    }

    /// Nodes (or JSON values) matched by the path, in document order.
    pub fn select<'a>(&self, scope: &Scope<'a>) -> Vec<Scope<'a>> {
        match (&self.path, scope) {
            (PathExpr::Structural(path), Scope::Html(node)) => {
                path.select(*node).into_iter().map(Scope::Html).collect()
            }
            (PathExpr::Json(path), Scope::Json(value)) => path
                .select(value)
                .into_iter()
                .map(|value| Scope::Json(Cow::Owned(value)))
                .collect(),
            _ => {
                log::debug!("rule {} does not apply to this document type", self.field);
                Vec::new()
            }
        }
    }

    /// Raw string values matched by the path. Capture is not applied.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Vec<String> {
        match (&self.path, scope) {
            (PathExpr::Structural(path), Scope::Html(node)) => path.strings(*node),
            (PathExpr::Json(path), Scope::Json(value)) => path.strings(value),
            _ => Vec::new(),
        }
    }

    /// First non-blank match with the capture applied.
    ///
    /// `None` when nothing matched or the capture came back blank. The
    /// captured group is returned as matched.
    pub fn extract(&self, scope: &Scope<'_>) -> Option<String> {
        let raw = self.extract_raw(scope)?;
        let value = crate::capture::capture(&raw, self.capture.as_ref());
        (!value.trim().is_empty()).then_some(value)
    }

    /// First non-blank raw match, without the capture.
    pub fn extract_raw(&self, scope: &Scope<'_>) -> Option<String> {
        self.evaluate(scope)
            .into_iter()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    pub fn capture(&self) -> Option<&Capture> {
        self.capture.as_ref()
    }
}
