// src/selector/structural.rs

//! Structural rules, evaluated by `sxd_xpath`.
//!
//! Adapter paths are written relative to the node they are applied to: a
//! leading `/` or `//` starts at the context node, not at the document root,
//! so one expression serves both page-level rules and per-item rules such as
//! `/@href`. [`StructuralPath::compile`] anchors every such location path with
//! an explicit `.` before the expression reaches the XPath engine.
//!
//! `concat()` is replaced by a variant that joins every node of a node-set
//! argument with `,` instead of keeping only the first one.

use sxd_xpath::context::Evaluation;
use sxd_xpath::function::{self, Function};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value, XPath};

/// Separator used by `concat()` between the values of one node-set.
pub const CONCAT_SEPARATOR: &str = ",";

/// A validated structural path.
#[derive(Debug, Clone)]
pub struct StructuralPath {
    source: String,
    expression: String,
}

impl StructuralPath {
    /// Anchor and validate an adapter path.
    pub fn compile(source: &str) -> Result<Self, String> {
        let expression = anchor_to_context(source);
        build(&expression)?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    /// The path as written in the adapter.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The anchored XPath handed to the engine.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Matched nodes in document order. Scalar results select nothing.
    pub fn select<'d>(&self, context: Node<'d>) -> Vec<Node<'d>> {
        match self.evaluate(context) {
            Some(Value::Nodeset(nodes)) => nodes.document_order(),
            _ => Vec::new(),
        }
    }

    /// String value of every match; a scalar result is a single string.
    pub fn strings(&self, context: Node<'_>) -> Vec<String> {
        match self.evaluate(context) {
            Some(Value::Nodeset(nodes)) => nodes
                .document_order()
                .iter()
                .map(|node| node.string_value())
                .collect(),
            Some(scalar) => vec![scalar_text(&scalar)],
            None => Vec::new(),
        }
    }

    fn evaluate<'d>(&self, node: Node<'d>) -> Option<Value<'d>> {
        // sxd_xpath expressions are neither Send nor Sync, so the validated
        // text is rebuilt per evaluation instead of living in the adapter.
        let xpath = build(&self.expression).ok()?;
        let mut context = Context::new();
        context.set_function("concat", JoinConcat);

        match xpath.evaluate(&context, node) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("path '{}' failed to evaluate: {:?}", self.source, e);
                None
            }
        }
    }
}

fn build(expression: &str) -> Result<XPath, String> {
    Factory::new()
        .build(expression)
        .map_err(|e| format!("invalid path '{expression}': {e:?}"))?
        .ok_or_else(|| "empty path".to_string())
}

/// Rewrite location paths that start with `/` so they start at the context
/// node, and lowercase names (HTML names are case-insensitive).
///
/// String literals are copied untouched.
fn anchor_to_context(source: &str) -> String {
    let source = source.trim();
    let mut out = String::with_capacity(source.len() + 4);
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut word = String::new();
    let mut boundary = false;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
                prev = Some(c);
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if starts_location_path(prev, &word) => {
                let lone = chars.peek().is_none_or(|next| !starts_step(*next));
                out.push('.');
                if !lone {
                    out.push('/');
                }
            }
            c if c.is_whitespace() => {
                out.push(c);
                boundary = true;
                continue;
            }
            c => out.push(c.to_ascii_lowercase()),
        }

        if !is_name_char(c) || boundary {
            word.clear();
        }
        if is_name_char(c) {
            word.push(c.to_ascii_lowercase());
        }
        boundary = false;
        prev = Some(c);
    }

    out
}

fn starts_location_path(prev: Option<char>, word: &str) -> bool {
    match prev {
        None => true,
        Some('(' | '[' | ',' | '|' | '=' | '<' | '>' | '+') => true,
        Some(c) if is_name_char(c) => matches!(word, "and" | "or" | "div" | "mod"),
        Some(_) => false,
    }
}

fn starts_step(c: char) -> bool {
    c == '/' || c == '@' || c == '*' || c == '.' || c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-')
}

fn scalar_text(value: &Value<'_>) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => format!("{}", *n as i64),
        Value::Number(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Nodeset(nodes) => nodes
            .document_order()
            .first()
            .map(|node| node.string_value())
            .unwrap_or_default(),
    }
}

/// `concat()` that keeps every node of a node-set argument.
struct JoinConcat;

impl Function for JoinConcat {
    fn evaluate<'c, 'd>(
        &self,
        _context: &Evaluation<'c, 'd>,
        args: Vec<Value<'d>>,
    ) -> Result<Value<'d>, function::Error> {
        let text = args
            .iter()
            .map(|arg| match arg {
                Value::Nodeset(nodes) => nodes
                    .document_order()
                    .iter()
                    .map(|node| node.string_value().trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect::<Vec<_>>()
                    .join(CONCAT_SEPARATOR),
                scalar => scalar_text(scalar),
            })
            .collect();
        Ok(Value::String(text))
    }
}
