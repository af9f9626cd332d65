//! CSS selector matching over the arena DOM.
//!
//! Selectors are parsed with scraper's selector implementation and matched by
//! the `selectors` engine through an [`Element`] impl on arena nodes, so the
//! supported syntax is the one `scraper::Selector` accepts.

use std::fmt;
use std::str::FromStr;

use html5ever::{Namespace, ns};
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{self, ElementSelectorFlags, MatchingContext};
use selectors::parser::{ParseRelative, SelectorList};
use selectors::{Element, OpaqueElement};

use crate::dom_tree::{Document, NodeId};
use crate::{LegibleError, Result};

/// A parsed selector list.
///
/// # Example
///
/// ```rust
/// use legible_core::{Document, Selector};
///
/// let doc = Document::parse("<div><br><p class=\"x\">a</p></div>").unwrap();
/// let selector: Selector = "div > br, p.x".parse().unwrap();
/// assert_eq!(doc.select_with(doc.root(), &selector).len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    selectors: SelectorList<Simple>,
}

impl FromStr for Selector {
    type Err = LegibleError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

impl Selector {
    /// Parses a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`LegibleError::InvalidSelector`] when the CSS does not parse.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser_input = cssparser::ParserInput::new(input);
        let mut parser = cssparser::Parser::new(&mut parser_input);

        SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map(|selectors| Self { selectors })
            .map_err(|_| LegibleError::InvalidSelector(input.to_string()))
    }

    /// Whether the element `id` matches any selector of the list.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        if !doc.is_element(id) {
            return false;
        }
        let element = ArenaElement { doc, id };
        let mut caches = matching::SelectorCaches::default();
        let mut context = MatchingContext::new(
            matching::MatchingMode::Normal,
            None,
            &mut caches,
            matching::QuirksMode::NoQuirks,
            matching::NeedsSelectorFlags::No,
            matching::MatchingForInvalidation::No,
        );
        self.selectors
            .slice()
            .iter()
            .any(|selector| matching::matches_selector(selector, 0, None, &element, &mut context))
    }
}

/// An element node seen through the `selectors` matching interface.
#[derive(Clone, Copy)]
struct ArenaElement<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl fmt::Debug for ArenaElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {}", self.doc.tag_name(self.id).unwrap_or(""), self.id)
    }
}

impl ArenaElement<'_> {
    fn wrap(&self, id: NodeId) -> Self {
        Self { doc: self.doc, id }
    }
}

impl Element for ArenaElement<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.doc.data(self.id))
    }

    fn parent_element(&self) -> Option<Self> {
        self.doc
            .parent(self.id)
            .filter(|parent| self.doc.is_element(*parent))
            .map(|parent| self.wrap(parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.doc.previous_element_sibling(self.id).map(|id| self.wrap(id))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.doc.next_element_sibling(self.id).map(|id| self.wrap(id))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc.first_element_child(self.id).map(|id| self.wrap(id))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &CssLocalName) -> bool {
        self.doc.tag_name(self.id) == Some(&*local_name.0)
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        *namespace == ns!(html)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.doc.tag_name(self.id) == other.doc.tag_name(other.id)
    }

    fn attr_matches(
        &self, ns: &NamespaceConstraint<&Namespace>, local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns
            && **url != ns!()
        {
            return false;
        }
        self.doc
            .attr(self.id, &local_name.0)
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self, _pseudo_class: &NonTSPseudoClass, _context: &mut MatchingContext<'_, Simple>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(&self, _pseudo_element: &PseudoElement, _context: &mut MatchingContext<'_, Simple>) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.doc.tag_name(self.id), Some("a" | "area" | "link")) && self.doc.has_attr(self.id, "href")
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.doc
            .attr(self.id, "id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.doc
            .class_name(self.id)
            .split_whitespace()
            .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
    }

    fn has_custom_state(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self
            .doc
            .children(self.id)
            .iter()
            .any(|child| self.doc.is_element(*child) || self.doc.text(*child).is_some_and(|t| !t.is_empty()))
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.id) == Some(self.doc.root())
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}

impl Document {
    /// Descendants of `scope` matching a parsed selector, in document order.
    pub fn select_with(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    /// Descendants of `scope` matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`LegibleError::InvalidSelector`] if the selector cannot be parsed.
    pub fn select(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        Ok(self.select_with(scope, &Selector::parse(selector)?))
    }

    /// Document-wide `querySelectorAll`.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.select(self.root(), selector)
    }

    /// Whether the element `id` matches `selector`.
    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool> {
        Ok(Selector::parse(selector)?.matches(self, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HTML: &str = r#"
        <html><body>
            <div id="main" class="content wide">
                <p class="lead">One</p>
                <ul><li><p>Nested</p></li></ul>
                <a href="https://example.com/a" rel="author nofollow">Link</a>
            </div>
            <div><br><br></div>
            <script type="application/ld+json">{}</script>
        </body></html>
    "#;

    #[rstest]
    #[case("p", 2)]
    #[case("div", 2)]
    #[case("#main", 1)]
    #[case(".content.wide", 1)]
    #[case("div.content > p", 1)]
    #[case("li p", 1)]
    #[case("div > br", 2)]
    #[case("br + br", 1)]
    #[case("p, a", 3)]
    #[case("[rel~=author]", 1)]
    #[case("a[href^=\"https://\"]", 1)]
    #[case("a[href$='/a']", 1)]
    #[case("a[href*=example]", 1)]
    #[case("script[type=\"application/ld+json\"]", 1)]
    #[case("div:not(#main)", 1)]
    #[case("*", 13)]
    fn test_select_counts(#[case] selector: &str, #[case] expected: usize) {
        let doc = Document::parse(HTML).unwrap();
        assert_eq!(doc.query_selector_all(selector).unwrap().len(), expected, "{selector}");
    }

    #[rstest]
    #[case("")]
    #[case("div[")]
    #[case("p..x")]
    #[case("div,")]
    #[case("p:hover")]
    fn test_invalid_selectors(#[case] selector: &str) {
        assert!(matches!(Selector::parse(selector), Err(LegibleError::InvalidSelector(_))));
    }

    #[test]
    fn test_scoped_select() {
        let doc = Document::parse(HTML).unwrap();
        let main = doc.query_selector_all("#main").unwrap()[0];
        assert_eq!(doc.select(main, "p").unwrap().len(), 2);
        assert!(doc.matches(main, "div.content").unwrap());
        assert!(!doc.matches(main, "section").unwrap());
    }

    #[test]
    fn test_matches_follow_mutation() {
        let mut doc = Document::parse(HTML).unwrap();
        let lead = doc.query_selector_all("p.lead").unwrap()[0];
        doc.set_tag(lead, "h2");
        doc.remove_class(lead, "lead");
        assert!(doc.query_selector_all("p.lead").unwrap().is_empty());
        assert_eq!(doc.query_selector_all("#main > h2").unwrap(), vec![lead]);
    }

    #[test]
    fn test_text_nodes_never_match() {
        let doc = Document::parse("<p>text</p>").unwrap();
        let p = doc.query_selector_all("p").unwrap()[0];
        let text = doc.first_child(p).unwrap();
        assert!(!Selector::parse("*").unwrap().matches(&doc, text));
    }
}
