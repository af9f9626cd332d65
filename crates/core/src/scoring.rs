//! Content scoring primitives.
//!
//! Regex tables for class/id signals, text and link density measures, and the
//! [`CandidateScores`] map that accumulates paragraph scores on their
//! containers during one extraction pass.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{Document, NodeId};

/// Class/id fragments of page chrome that is almost never article content.
pub static UNLIKELY_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .unwrap()
});

/// Fragments that rescue an element from [`UNLIKELY_CANDIDATES`].
pub static OK_MAYBE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)and|article|body|column|content|main|mathjax|shadow").unwrap());

pub static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story").unwrap()
});

pub static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget",
    )
    .unwrap()
});

pub static BYLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap());

/// Default allow-list for embedded players.
pub static VIDEOS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)",
    )
    .unwrap()
});

pub static SHARE_ELEMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\b|_)(share|sharedaddy)(\b|_)").unwrap());

pub static COMMAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{002C}\u{060C}\u{FE50}\u{FE10}\u{FE11}\u{2E41}\u{2E34}\u{2E32}\u{FF0C}]").unwrap());

pub static AD_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ad(vertising|vertisement)?|pub(licité)?|werb(ung)?|广告|Реклама|Anuncio)$").unwrap()
});

pub static LOADING_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^((loading|正在加载|Загрузка|chargement|cargando)(…|\.\.\.)?)$").unwrap());

static HASH_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#.+").unwrap());

/// Weight applied by a positive or negative class/id match.
pub const SIGNAL_WEIGHT: f64 = 25.0;

/// Result of matching class names and id against the signal tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSignal {
    Positive,
    Negative,
    Neutral,
}

/// Net class/id weight: ±25 for the class attribute and ±25 for the id.
pub fn signal_weight(class_name: &str, id: &str) -> f64 {
    let mut weight = 0.0;
    for value in [class_name, id] {
        if value.is_empty() {
            continue;
        }
        if NEGATIVE.is_match(value) {
            weight -= SIGNAL_WEIGHT;
        }
        if POSITIVE.is_match(value) {
            weight += SIGNAL_WEIGHT;
        }
    }
    weight
}

/// Classifies an element by the sign of its [`signal_weight`].
///
/// ```rust
/// use legible_core::scoring::{ClassSignal, classify_signal};
///
/// assert_eq!(classify_signal("post-body", ""), ClassSignal::Positive);
/// assert_eq!(classify_signal("sidebar", "comments"), ClassSignal::Negative);
/// assert_eq!(classify_signal("", ""), ClassSignal::Neutral);
/// ```
pub fn classify_signal(class_name: &str, id: &str) -> ClassSignal {
    let weight = signal_weight(class_name, id);
    if weight > 0.0 {
        ClassSignal::Positive
    } else if weight < 0.0 {
        ClassSignal::Negative
    } else {
        ClassSignal::Neutral
    }
}

/// Class weight of an element, or 0 when class weighting is disabled.
pub fn class_weight(doc: &Document, id: NodeId, weight_classes: bool) -> f64 {
    if !weight_classes {
        return 0.0;
    }
    signal_weight(doc.class_name(id), doc.id_attr(id))
}

/// Base score an element receives when it first becomes a candidate.
pub fn tag_base_score(tag: &str) -> f64 {
    match tag {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// Collapses whitespace runs to single spaces and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, whitespace-normalized text of a node.
pub fn inner_text(doc: &Document, id: NodeId) -> String {
    normalize_whitespace(&doc.text_content(id))
}

/// Character length of [`inner_text`].
pub fn text_length(doc: &Document, id: NodeId) -> usize {
    inner_text(doc, id).chars().count()
}

/// Number of comma-separated segments, counting all comma variants.
pub fn comma_segments(text: &str) -> usize {
    COMMAS.split(text).count()
}

/// Score a paragraph-like element contributes to itself and its ancestors:
/// one point, plus a point per comma-separated segment, plus a point per 100
/// characters capped at three.
///
/// Segments are commas + 1, so text without commas already scores two.
pub fn content_score(text: &str) -> f64 {
    let length = text.chars().count();
    1.0 + comma_segments(text) as f64 + (length / 100).min(3) as f64
}

/// Share of an element's text that sits inside links.
///
/// Links pointing at an in-page fragment count for 30% of their length.
pub fn link_density(doc: &Document, id: NodeId) -> f64 {
    let total = text_length(doc, id);
    if total == 0 {
        return 0.0;
    }

    let link_length: f64 = doc
        .elements_by_tag(id, &["a"])
        .into_iter()
        .map(|link| {
            let coefficient = match doc.attr(link, "href") {
                Some(href) if HASH_URL.is_match(href) => 0.3,
                _ => 1.0,
            };
            text_length(doc, link) as f64 * coefficient
        })
        .sum();

    link_length / total as f64
}

/// Share of an element's text that sits inside descendants with the given tags.
pub fn text_density(doc: &Document, id: NodeId, tags: &[&str]) -> f64 {
    let total = text_length(doc, id);
    if total == 0 {
        return 0.0;
    }
    let children: usize = doc.elements_by_tag(id, tags).into_iter().map(|c| text_length(doc, c)).sum();
    children as f64 / total as f64
}

/// Accumulated content scores for one extraction pass, keyed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct CandidateScores {
    scores: HashMap<NodeId, f64>,
}

impl CandidateScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<f64> {
        self.scores.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.scores.contains_key(&id)
    }

    pub fn set(&mut self, id: NodeId, score: f64) {
        self.scores.insert(id, score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Gives `id` its tag base score plus class weight, unless it already has a score.
    pub fn initialize(&mut self, doc: &Document, id: NodeId, weight_classes: bool) {
        if self.contains(id) {
            return;
        }
        let base = doc.tag_name(id).map(tag_base_score).unwrap_or(0.0);
        self.set(id, base + class_weight(doc, id, weight_classes));
    }

    /// Adds `amount` to the score of `id`, initializing it first.
    pub fn add(&mut self, doc: &Document, id: NodeId, amount: f64, weight_classes: bool) {
        self.initialize(doc, id, weight_classes);
        if let Some(score) = self.scores.get_mut(&id) {
            *score += amount;
        }
    }

    /// Scales every score by `1 - link_density`.
    pub fn apply_link_density(&mut self, doc: &Document) {
        for (id, score) in self.scores.iter_mut() {
            *score *= 1.0 - link_density(doc, *id);
        }
    }

    /// The `limit` best attached candidates, highest score first.
    ///
    /// Ties go to the element that comes first in document order.
    pub fn top_candidates(&self, doc: &Document, limit: usize) -> Vec<(NodeId, f64)> {
        let order: HashMap<NodeId, usize> =
            doc.descendants(doc.root()).into_iter().enumerate().map(|(i, id)| (id, i)).collect();

        let mut ranked: Vec<(NodeId, f64, usize)> = self
            .scores
            .iter()
            .filter_map(|(id, score)| order.get(id).map(|position| (*id, *score, *position)))
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.2.cmp(&b.2)));
        ranked.truncate(limit.max(1));
        ranked.into_iter().map(|(id, score, _)| (id, score)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector_all(selector).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_signal_weight() {
        assert_eq!(signal_weight("article-body", ""), 25.0);
        assert_eq!(signal_weight("sidebar", "comments"), -50.0);
        assert_eq!(signal_weight("main", "sidebar"), 0.0);
        assert_eq!(signal_weight("", ""), 0.0);
    }

    #[test]
    fn test_classify_signal_table() {
        assert_eq!(classify_signal("entry-content", ""), ClassSignal::Positive);
        assert_eq!(classify_signal("", "footer"), ClassSignal::Negative);
        assert_eq!(classify_signal("lorem", "ipsum"), ClassSignal::Neutral);
    }

    #[test]
    fn test_class_weight_respects_flag() {
        let doc = Document::parse(r#"<div class="comment">x</div>"#).unwrap();
        let div = first(&doc, "div");
        assert_eq!(class_weight(&doc, div, true), -25.0);
        assert_eq!(class_weight(&doc, div, false), 0.0);
    }

    #[test]
    fn test_tag_base_score() {
        assert_eq!(tag_base_score("div"), 5.0);
        assert_eq!(tag_base_score("blockquote"), 3.0);
        assert_eq!(tag_base_score("li"), -3.0);
        assert_eq!(tag_base_score("th"), -5.0);
        assert_eq!(tag_base_score("p"), 0.0);
    }

    #[test]
    fn test_content_score() {
        assert_eq!(content_score("short"), 2.0);
        assert_eq!(content_score("one, two, three"), 4.0);
        assert_eq!(content_score(&"a".repeat(250)), 4.0);
        assert_eq!(content_score(&"a".repeat(1000)), 5.0);
    }

    #[test]
    fn test_unicode_commas() {
        assert_eq!(comma_segments("一，二，三"), 3);
        assert_eq!(comma_segments("واحد، اثنان"), 2);
    }

    #[test]
    fn test_link_density() {
        let doc =
            Document::parse(r##"<div><a href="/x">12345</a>67890<a href="#top">abcdefghij</a></div>"##).unwrap();
        let div = first(&doc, "div");
        let expected = (5.0 + 10.0 * 0.3) / 20.0;
        assert!((link_density(&doc, div) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_link_density_empty() {
        let doc = Document::parse("<div></div>").unwrap();
        assert_eq!(link_density(&doc, first(&doc, "div")), 0.0);
    }

    #[test]
    fn test_text_density() {
        let doc = Document::parse("<div><span>abcde</span>fghij</div>").unwrap();
        let div = first(&doc, "div");
        assert!((text_density(&doc, div, &["span"]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_inner_text_normalizes() {
        let doc = Document::parse("<p>  a \n\n b\t c  </p>").unwrap();
        assert_eq!(inner_text(&doc, first(&doc, "p")), "a b c");
    }

    #[test]
    fn test_link_density_reorders_candidates() {
        let html = r#"<body>
            <div id="a">aaaaaaaaaaaaaaaaaaaaa<a href="/x">lllllllll</a></div>
            <div id="b">bbbbbbbbbbbbbbbbbbbbbbbbbbbbbb</div>
        </body>"#;
        let doc = Document::parse(html).unwrap();
        let a = first(&doc, "#a");
        let b = first(&doc, "#b");

        let mut scores = CandidateScores::new();
        scores.set(a, 100.0);
        scores.set(b, 95.0);
        assert_eq!(scores.top_candidates(&doc, 5)[0].0, a);

        scores.apply_link_density(&doc);
        let ranked = scores.top_candidates(&doc, 5);
        assert_eq!(ranked[0].0, b);
        assert!((ranked[1].1 - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_go_to_document_order() {
        let doc = Document::parse(r#"<div id="first"></div><div id="second"></div>"#).unwrap();
        let first_div = first(&doc, "#first");
        let second_div = first(&doc, "#second");

        let mut scores = CandidateScores::new();
        scores.set(second_div, 10.0);
        scores.set(first_div, 10.0);
        let ranked = scores.top_candidates(&doc, 1);
        assert_eq!(ranked, vec![(first_div, 10.0)]);
    }

    #[test]
    fn test_initialize_and_add() {
        let doc = Document::parse(r#"<div class="content">x</div>"#).unwrap();
        let div = first(&doc, "div");
        let mut scores = CandidateScores::new();
        scores.add(&doc, div, 4.0, true);
        assert_eq!(scores.get(div), Some(5.0 + 25.0 + 4.0));
        scores.add(&doc, div, 1.0, true);
        assert_eq!(scores.get(div), Some(35.0));
    }
}
