//! Reader-mode availability check.
//!
//! A cheap estimate of whether a page holds enough prose to be worth a full
//! extraction. It never mutates the document and never runs the scoring
//! engine, so a page can be "not readerable" and still parse.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::dom_tree::{Document, NodeId};
use crate::parse::HtmlSource;
use crate::preprocess::is_probably_visible;
use crate::scoring::{OK_MAYBE_CANDIDATE, UNLIKELY_CANDIDATES};
use crate::selector::Selector;

static PARAGRAPH_NODES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p, pre, article").unwrap());

static DIV_BR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div > br").unwrap());

static FRAMESET: LazyLock<Selector> = LazyLock::new(|| Selector::parse("frameset").unwrap());

/// Thresholds for [`is_probably_readerable_with_options`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderableOptions {
    /// Minimum text length of a node before it counts (default: 140)
    pub min_content_length: usize,
    /// Score the page must exceed (default: 20.0)
    pub min_score: f64,
}

impl Default for ReaderableOptions {
    fn default() -> Self {
        Self { min_content_length: 140, min_score: 20.0 }
    }
}

impl ReaderableOptions {
    pub fn min_content_length(mut self, value: usize) -> Self {
        self.min_content_length = value;
        self
    }

    pub fn min_score(mut self, value: f64) -> Self {
        self.min_score = value;
        self
    }
}

/// Whether reader mode should be offered for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderAvailability {
    Available,
    Unavailable,
}

impl From<bool> for ReaderAvailability {
    fn from(readerable: bool) -> Self {
        if readerable { ReaderAvailability::Available } else { ReaderAvailability::Unavailable }
    }
}

impl fmt::Display for ReaderAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderAvailability::Available => write!(f, "Available"),
            ReaderAvailability::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// Decides whether a document probably contains an article, with the
/// default thresholds.
///
/// # Example
///
/// ```rust
/// use legible_core::is_probably_readerable;
///
/// let paragraph = "Long enough sentence about something worth reading. ".repeat(6);
/// let article = format!("<html><body><p>{0}</p><p>{0}</p></body></html>", paragraph);
/// assert!(is_probably_readerable(article.as_str()));
///
/// let nav = "<html><body><nav><a href='/'>Home</a><a href='/about'>About</a></nav></body></html>";
/// assert!(!is_probably_readerable(nav));
/// ```
pub fn is_probably_readerable<S: HtmlSource + ?Sized>(source: &S) -> bool {
    is_probably_readerable_with_options(source, &ReaderableOptions::default())
}

/// Decides whether a document probably contains an article.
///
/// Unparseable input is never readerable.
pub fn is_probably_readerable_with_options<S: HtmlSource + ?Sized>(source: &S, options: &ReaderableOptions) -> bool {
    match source.to_document() {
        Ok(doc) => score_document(&doc, options),
        Err(_) => false,
    }
}

/// Maps [`is_probably_readerable`] onto a [`ReaderAvailability`].
pub fn check_availability<S: HtmlSource + ?Sized>(source: &S) -> ReaderAvailability {
    is_probably_readerable(source).into()
}

fn score_document(doc: &Document, options: &ReaderableOptions) -> bool {
    let root = doc.root();
    if !doc.select_with(root, &FRAMESET).is_empty() {
        return false;
    }

    let mut score = 0.0;
    candidate_nodes(doc).into_iter().any(|node| {
        if !is_probably_visible(doc, node) {
            return false;
        }

        let match_string = format!("{} {}", doc.class_name(node), doc.id_attr(node));
        if UNLIKELY_CANDIDATES.is_match(&match_string) && !OK_MAYBE_CANDIDATE.is_match(&match_string) {
            return false;
        }

        if doc.is_tag(node, "p") && doc.has_ancestor_tag(node, "li") {
            return false;
        }

        let length = doc.text_content(node).trim().chars().count();
        if length < options.min_content_length {
            return false;
        }

        score += ((length - options.min_content_length) as f64).sqrt();
        score > options.min_score
    })
}

/// `p, pre, article` elements followed by the parents of `div > br`.
fn candidate_nodes(doc: &Document) -> Vec<NodeId> {
    let root = doc.root();
    let mut nodes = doc.select_with(root, &PARAGRAPH_NODES);
    let mut seen: HashSet<NodeId> = nodes.iter().copied().collect();

    for br in doc.select_with(root, &DIV_BR) {
        if let Some(parent) = doc.parent(br)
            && seen.insert(parent)
        {
            nodes.push(parent);
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(sentences: usize) -> String {
        "This sentence is part of a long and meaningful paragraph of prose. ".repeat(sentences)
    }

    #[test]
    fn test_article_is_readerable() {
        let html = format!("<html><body><article><p>{0}</p><p>{0}</p></article></body></html>", long_text(8));
        assert!(is_probably_readerable(html.as_str()));
        assert_eq!(check_availability(html.as_str()), ReaderAvailability::Available);
    }

    #[test]
    fn test_short_content_is_not_readerable() {
        let html = "<html><body><p>Too short.</p><p>Also short.</p></body></html>";
        assert!(!is_probably_readerable(html));
        assert_eq!(check_availability(html), ReaderAvailability::Unavailable);
    }

    #[test]
    fn test_hidden_and_unlikely_nodes_are_skipped() {
        let text = long_text(10);
        let hidden = format!(r#"<body><p style="display: none">{text}</p><p hidden>{text}</p></body>"#);
        assert!(!is_probably_readerable(hidden.as_str()));

        let unlikely = format!(r#"<body><p class="sidebar">{text}</p><p id="comment">{text}</p></body>"#);
        assert!(!is_probably_readerable(unlikely.as_str()));

        let rescued = format!(r#"<body><p class="sidebar article">{text}</p><p>{text}</p></body>"#);
        assert!(is_probably_readerable(rescued.as_str()));
    }

    #[test]
    fn test_list_paragraphs_are_skipped() {
        let text = long_text(10);
        let html = format!("<body><ul><li><p>{text}</p></li><li><p>{text}</p></li></ul></body>");
        assert!(!is_probably_readerable(html.as_str()));
    }

    #[test]
    fn test_br_divs_count() {
        let text = long_text(5);
        let html = format!("<body><div>{text}<br>{text}<br>{text}</div></body>");
        assert!(is_probably_readerable(html.as_str()));
    }

    #[test]
    fn test_frameset_is_never_readerable() {
        let html = format!(
            r#"<html><head><title>Frames</title></head><frameset cols="50%,50%"><frame src="a.html"><noframes><p>{}</p></noframes></frameset></html>"#,
            long_text(20)
        );
        assert!(!is_probably_readerable(html.as_str()));
    }

    #[test]
    fn test_options_change_the_outcome() {
        let html = format!("<body><p>{}</p></body>", long_text(4));
        assert!(!is_probably_readerable(html.as_str()));

        let lenient = ReaderableOptions::default().min_content_length(50).min_score(5.0);
        assert!(is_probably_readerable_with_options(html.as_str(), &lenient));
    }

    #[test]
    fn test_parsed_document_is_not_mutated() {
        let doc = Document::parse(&format!("<body><p>{}</p></body>", long_text(10))).unwrap();
        let before = doc.to_html();
        assert!(is_probably_readerable(&doc));
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_availability_serializes_as_variant_name() {
        assert_eq!(serde_json::to_string(&ReaderAvailability::Available).unwrap(), "\"Available\"");
        assert_eq!(ReaderAvailability::Unavailable.to_string(), "Unavailable");
    }
}
