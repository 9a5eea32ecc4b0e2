// src/selector/document.rs

//! HTML pages as XPath-addressable trees.
//!
//! Pages are parsed leniently by `scraper` (unclosed tags, void elements and
//! bare attributes are all fine) and copied into an `sxd_document` package,
//! which is what `sxd_xpath` evaluates against. Comments, doctypes and
//! processing instructions are not copied.

use scraper::{ElementRef, Html};
use sxd_document::Package;
use sxd_document::dom::{Document, Element};
use sxd_xpath::nodeset::Node;

/// A parsed HTML page.
pub struct HtmlDocument {
    package: Package,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let source = Html::parse_document(html);
        let package = Package::new();
        copy_tree(&source, package.as_document());
        Self { package }
    }

    /// The document node, parent of `<html>`.
    pub fn root(&self) -> Node<'_> {
        Node::Root(self.package.as_document().root())
    }
}

fn copy_tree(source: &Html, document: Document<'_>) {
    let html = source.root_element();
    let root = copy_element(document, html);
    document.root().append_child(root);

    let mut pending = vec![(html, root)];
    while let Some((from, to)) = pending.pop() {
        for child in from.children() {
            if let Some(element) = ElementRef::wrap(child) {
                let copy = copy_element(document, element);
                to.append_child(copy);
                pending.push((element, copy));
            } else if let Some(text) = child.value().as_text() {
                to.append_child(document.create_text(text));
            }
        }
    }
}

fn copy_element<'d>(document: Document<'d>, source: ElementRef<'_>) -> Element<'d> {
    let element = document.create_element(source.value().name());
    for (name, value) in source.value().attrs() {
        element.set_attribute_value(name, value);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use sxd_xpath::{Context, Factory, Value};

    fn strings(document: &HtmlDocument, path: &str) -> Vec<String> {
        let xpath = Factory::new().build(path).unwrap().unwrap();
        match xpath.evaluate(&Context::new(), document.root()).unwrap() {
            Value::Nodeset(nodes) => nodes
                .document_order()
                .iter()
                .map(|n| n.string_value())
                .collect(),
            other => panic!("expected nodes, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_markup_is_addressable() {
        let document = HtmlDocument::parse(
            "<!DOCTYPE html><div class=a><p>one<br>two<input disabled></div><!-- gone -->",
        );
        assert_eq!(strings(&document, "//div[@class='a']/p/text()"), vec!["one", "two"]);
        assert_eq!(strings(&document, "//input/@disabled"), vec![""]);
        assert!(strings(&document, "//comment()").is_empty());
    }

    #[test]
    fn test_parser_inserted_elements() {
        let document = HtmlDocument::parse("<table><tr><td>x</td></tr></table>");
        assert_eq!(strings(&document, "/html/body/table/tbody/tr/td"), vec!["x"]);
    }

    #[test]
    fn test_children_keep_document_order() {
        let document = HtmlDocument::parse("<ul><li>1</li><li>2<b>b</b></li><li>3</li></ul>");
        assert_eq!(strings(&document, "//li"), vec!["1", "2b", "3"]);
    }
}
