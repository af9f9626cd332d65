//! HTML parsing into the arena DOM.
//!
//! Markup is parsed by html5ever (through `scraper`), which applies the
//! standard error-recovery rules, and the resulting tree is copied into a
//! [`Document`].
//!
//! # Example
//!
//! ```rust
//! use legible_core::parse::parse_html;
//!
//! let doc = parse_html("<title>Test</title><p>Unclosed <b>markup").unwrap();
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert!(doc.body().is_some());
//! ```

use std::borrow::Cow;

use scraper::{Html, Node};

use crate::dom_tree::{Document, ElementData, NodeData, NodeId};
use crate::{LegibleError, Result};

/// Parses a full HTML document.
///
/// # Errors
///
/// Returns [`LegibleError::MalformedMarkup`] when no `<html>` root could be
/// built from the source.
pub fn parse_html(raw: &str) -> Result<Document> {
    let html = Html::parse_document(raw);
    let mut doc = Document::new();
    let root = doc.root();
    import_children(&mut doc, html.tree.root(), root);

    if doc.html_element().is_none() {
        return Err(LegibleError::MalformedMarkup("no root element could be constructed".to_string()));
    }
    Ok(doc)
}

/// Parses `html` as a body fragment and returns the new top-level nodes,
/// detached, in order.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Vec<NodeId> {
    let fragment = Html::parse_fragment(html);
    let holder = doc.create_element("template");
    import_children(doc, *fragment.root_element(), holder);

    let nodes = doc.children(holder).to_vec();
    doc.clear_children(holder);
    nodes
}

fn convert(node: &Node) -> Option<NodeData> {
    match node {
        Node::Doctype(doctype) => Some(NodeData::Doctype(doctype.name().to_string())),
        Node::Comment(comment) => Some(NodeData::Comment(String::from(&**comment))),
        Node::Text(text) => Some(NodeData::Text(String::from(&**text))),
        Node::Element(el) => Some(NodeData::Element(ElementData {
            name: el.name().to_ascii_lowercase(),
            attrs: el
                .attrs()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect(),
        })),
        _ => None,
    }
}

fn import_children(doc: &mut Document, source: ego_tree::NodeRef<'_, Node>, target: NodeId) {
    let mut stack = vec![(source, target)];
    while let Some((node, parent)) = stack.pop() {
        for child in node.children() {
            let Some(data) = convert(child.value()) else { continue };
            let id = doc.push(data);
            doc.append_child(parent, id);
            stack.push((child, id));
        }
    }
}

/// Anything the extractor can read a document from.
///
/// Markup sources are parsed on demand; an already parsed [`Document`] is
/// borrowed and cloned only when the caller needs to mutate it.
pub trait HtmlSource {
    fn to_document(&self) -> Result<Cow<'_, Document>>;

    /// Raw markup, when the source still has it.
    fn markup(&self) -> Option<&str> {
        None
    }
}

impl HtmlSource for str {
    fn to_document(&self) -> Result<Cow<'_, Document>> {
        parse_html(self).map(Cow::Owned)
    }

    fn markup(&self) -> Option<&str> {
        Some(self)
    }
}

impl HtmlSource for String {
    fn to_document(&self) -> Result<Cow<'_, Document>> {
        self.as_str().to_document()
    }

    fn markup(&self) -> Option<&str> {
        Some(self)
    }
}

impl HtmlSource for Document {
    fn to_document(&self) -> Result<Cow<'_, Document>> {
        Ok(Cow::Borrowed(self))
    }
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use legible_core::Document;
    ///
    /// let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hello</p></body></html>").unwrap();
    /// assert_eq!(doc.title(), Some("Test".to_string()));
    /// ```
    pub fn parse(html: &str) -> Result<Self> {
        parse_html(html)
    }

    /// Replaces the children of `id` with the nodes parsed from `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        let nodes = parse_fragment(self, html);
        self.clear_children(id);
        for node in nodes {
            self.append_child(id, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc = parse_html("<html><head><title>Test</title></head><body><p>Hello</p></body></html>").unwrap();
        assert_eq!(doc.title(), Some("Test".to_string()));
        let body = doc.body().unwrap();
        assert_eq!(doc.text_content(body), "Hello");
    }

    #[test]
    fn test_lenient_recovery() {
        let doc = parse_html("<div><p>one<p>two</div></span>").unwrap();
        let paragraphs = doc.elements_by_tag(doc.root(), &["p"]);
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_empty_input_still_has_root() {
        let doc = parse_html("").unwrap();
        assert!(doc.html_element().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_attributes_and_doctype() {
        let doc = parse_html("<!DOCTYPE html><html lang=\"en\"><body><a HREF=\"/x\">x</a></body></html>").unwrap();
        assert!(matches!(doc.data(doc.first_child(doc.root()).unwrap()), NodeData::Doctype(name) if name == "html"));
        let html = doc.html_element().unwrap();
        assert_eq!(doc.attr(html, "lang"), Some("en"));
        let link = doc.elements_by_tag(doc.root(), &["a"])[0];
        assert_eq!(doc.attr(link, "href"), Some("/x"));
    }

    #[test]
    fn test_set_inner_html() {
        let mut doc = parse_html("<div id=\"box\"><span>old</span></div>").unwrap();
        let div = doc.elements_by_tag(doc.root(), &["div"])[0];
        doc.set_inner_html(div, "<p>new</p>tail");
        assert_eq!(doc.children(div).len(), 2);
        assert_eq!(doc.text_content(div), "newtail");
    }

    #[test]
    fn test_html_sources() {
        let markup = String::from("<p>source</p>");
        assert_eq!(markup.markup(), Some("<p>source</p>"));
        let owned = markup.to_document().unwrap();
        assert!(matches!(owned, Cow::Owned(_)));

        let doc = parse_html("<p>parsed</p>").unwrap();
        assert!(doc.markup().is_none());
        assert!(matches!(doc.to_document().unwrap(), Cow::Borrowed(_)));
    }
}
