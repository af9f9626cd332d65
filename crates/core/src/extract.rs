//! Article extraction.
//!
//! Finds the subtree holding the main content of a sanitized document:
//! paragraphs are scored onto their containers, the best container is
//! merged with related siblings, and the result goes through a series of
//! cleanup passes. A pass whose output is too short is retried first with
//! the other retained candidates, then with looser heuristics.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::dom_tree::{Document, NodeId};
use crate::metadata::text_similarity;
use crate::preprocess::{has_single_tag_inside, is_document_root, is_phrasing_content, is_whitespace_node};
use crate::scoring::{
    AD_WORDS, BYLINE, CandidateScores, LOADING_WORDS, OK_MAYBE_CANDIDATE, SHARE_ELEMENTS, UNLIKELY_CANDIDATES, VIDEOS,
    class_weight, content_score, inner_text, link_density, text_density, text_length,
};

/// Paragraphs shorter than this are not scored.
const MIN_PARAGRAPH_LENGTH: usize = 25;

/// Share widgets at least this long are kept.
const SHARE_ELEMENT_THRESHOLD: usize = 500;

/// Alternative candidates needed before their common ancestor is promoted.
const MINIMUM_TOP_CANDIDATES: usize = 3;

const TAGS_TO_SCORE: &[&str] = &["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

const DIV_TO_P_ELEMS: &[&str] = &["blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul"];

const ALTER_TO_DIV_EXCEPTIONS: &[&str] = &["div", "article", "section", "p", "ol", "ul"];

const UNLIKELY_ROLES: &[&str] = &["menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog"];

const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: &[&str] = &["table", "th", "td", "hr", "pre"];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

static B64_DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,").unwrap());

static BASE64_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)base64\s*").unwrap());

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").unwrap());

static LAZY_SRCSET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").unwrap());

static LAZY_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").unwrap());

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum normalized text length of an accepted article
    pub char_threshold: usize,
    /// Number of top candidates retained after scoring
    pub nb_top_candidates: usize,
    /// Added to the link density limits of conditional cleaning
    pub link_density_modifier: f64,
    /// Embeds whose attributes match this survive cleanup
    pub allowed_video_regex: Regex,
    /// Emit diagnostic tracing
    pub debug: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            char_threshold: 500,
            nb_top_candidates: 5,
            link_density_modifier: 0.0,
            allowed_video_regex: VIDEOS.clone(),
            debug: false,
        }
    }
}

/// Heuristics that are switched off one at a time when an attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub strip_unlikelys: bool,
    pub weight_classes: bool,
    pub clean_conditionally: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self { strip_unlikelys: true, weight_classes: true, clean_conditionally: true }
    }
}

impl Flags {
    /// Turns off the next heuristic. Returns `false` once all are off.
    pub fn relax(&mut self) -> bool {
        if self.strip_unlikelys {
            self.strip_unlikelys = false;
        } else if self.weight_classes {
            self.weight_classes = false;
        } else if self.clean_conditionally {
            self.clean_conditionally = false;
        } else {
            return false;
        }
        true
    }
}

/// An accepted extraction.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// The working document the content lives in
    pub doc: Document,
    /// Detached wrapper whose single child is `div#readability-page-1`
    pub content: NodeId,
    /// Text of the byline element removed during traversal
    pub byline: Option<String>,
    /// Nearest explicit `dir` around the top candidate
    pub dir: Option<String>,
    /// `lang` of the `<html>` element
    pub lang: Option<String>,
    /// First `h1`, else `h2`, of the assembled content before cleanup
    pub heading: Option<String>,
    /// Normalized text length of the content
    pub text_length: usize,
    /// Heuristics that were active for the accepted attempt
    pub flags: Flags,
}

/// Runs the extraction attempts over a sanitized document.
///
/// `doc` is never mutated; every attempt works on a clone. Returns `None`
/// when no attempt yields at least `char_threshold` characters.
///
/// # Example
///
/// ```rust
/// use legible_core::Document;
/// use legible_core::extract::{ExtractConfig, grab_article};
///
/// let para = "A long enough sentence, with commas, that reads like prose. ".repeat(4);
/// let html = format!("<body><div class=\"article\"><p>{para}</p><p>{para}</p></div></body>");
/// let doc = Document::parse(&html).unwrap();
///
/// let config = ExtractConfig { char_threshold: 100, ..Default::default() };
/// let found = grab_article(&doc, &config, "").unwrap();
/// assert!(found.text_length >= 100);
/// ```
pub fn grab_article(doc: &Document, config: &ExtractConfig, article_title: &str) -> Option<ExtractedContent> {
    let mut flags = Flags::default();
    loop {
        let pass = Pass { config, flags, article_title };
        if let Some(found) = pass.run(doc.clone()) {
            if config.debug {
                debug!(target: "legible", ?flags, length = found.text_length, "article accepted");
            }
            return Some(found);
        }
        if !flags.relax() {
            if config.debug {
                debug!(target: "legible", "no attempt reached the character threshold");
            }
            return None;
        }
        if config.debug {
            debug!(target: "legible", ?flags, "retrying with relaxed heuristics");
        }
    }
}

/// Output of the traversal that precedes scoring.
struct Traversal {
    elements_to_score: Vec<NodeId>,
    byline: Option<String>,
    lang: Option<String>,
}

struct Pass<'a> {
    config: &'a ExtractConfig,
    flags: Flags,
    article_title: &'a str,
}

impl Pass<'_> {
    fn run(&self, mut doc: Document) -> Option<ExtractedContent> {
        doc.body()?;
        let traversal = self.prepare_nodes(&mut doc);
        let scores = self.score_elements(&doc, &traversal.elements_to_score);
        let ranked = scores.top_candidates(&doc, self.config.nb_top_candidates);

        if self.config.debug {
            for (id, score) in &ranked {
                debug!(target: "legible", candidate = %id, tag = doc.tag_name(*id).unwrap_or(""), score, "top candidate");
            }
        }

        let primary = self.assemble(doc.clone(), scores.clone(), &ranked, None)?;
        if primary.text_length >= self.config.char_threshold {
            return Some(self.finish(primary, traversal));
        }

        for &(alternative, _) in ranked.iter().skip(1) {
            if doc.body() == Some(alternative) {
                continue;
            }
            let Some(found) = self.assemble(doc.clone(), scores.clone(), &ranked, Some(alternative)) else {
                continue;
            };
            if self.config.debug {
                debug!(target: "legible", candidate = %alternative, length = found.text_length, "alternative candidate");
            }
            if found.text_length >= self.config.char_threshold {
                return Some(self.finish(found, traversal));
            }
        }
        None
    }

    fn finish(&self, assembled: Assembled, traversal: Traversal) -> ExtractedContent {
        ExtractedContent {
            doc: assembled.doc,
            content: assembled.content,
            byline: traversal.byline,
            dir: assembled.dir,
            lang: traversal.lang,
            heading: assembled.heading,
            text_length: assembled.text_length,
            flags: self.flags,
        }
    }

    /// Removes unlikely nodes and collects the elements to score.
    fn prepare_nodes(&self, doc: &mut Document) -> Traversal {
        let lang = doc
            .html_element()
            .and_then(|html| doc.attr(html, "lang"))
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string);

        let mut elements_to_score = Vec::new();
        let mut byline: Option<String> = None;
        let mut should_remove_title_header = !self.article_title.trim().is_empty();
        let mut node = doc.html_element();

        while let Some(current) = node {
            if is_document_root(doc, current) {
                node = doc.next_element(current, false);
                continue;
            }

            let tag = doc.tag_name(current).unwrap_or("").to_string();
            let match_string = format!("{} {}", doc.class_name(current), doc.id_attr(current));

            if doc.attr(current, "aria-modal") == Some("true") && doc.attr(current, "role") == Some("dialog") {
                node = doc.remove_and_get_next(current);
                continue;
            }

            if byline.is_none()
                && let Some(text) = valid_byline(doc, current, &match_string)
            {
                byline = Some(text);
                node = doc.remove_and_get_next(current);
                continue;
            }

            if should_remove_title_header && self.header_duplicates_title(doc, current) {
                should_remove_title_header = false;
                node = doc.remove_and_get_next(current);
                continue;
            }

            if self.flags.strip_unlikelys {
                if UNLIKELY_CANDIDATES.is_match(&match_string)
                    && !OK_MAYBE_CANDIDATE.is_match(&match_string)
                    && !doc.has_ancestor_tag(current, "table")
                    && !doc.has_ancestor_tag(current, "code")
                    && tag != "a"
                {
                    if self.config.debug {
                        debug!(target: "legible", node = %current, %match_string, "removing unlikely candidate");
                    }
                    node = doc.remove_and_get_next(current);
                    continue;
                }
                if doc.attr(current, "role").is_some_and(|role| UNLIKELY_ROLES.contains(&role)) {
                    node = doc.remove_and_get_next(current);
                    continue;
                }
            }

            if matches!(tag.as_str(), "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
                && is_element_without_content(doc, current)
            {
                node = doc.remove_and_get_next(current);
                continue;
            }

            if TAGS_TO_SCORE.contains(&tag.as_str()) {
                elements_to_score.push(current);
            }

            let mut current = current;
            if tag == "div" {
                wrap_phrasing_runs(doc, current);

                if has_single_tag_inside(doc, current, "p") && link_density(doc, current) < 0.25 {
                    if let Some(p) = doc.first_element_child(current) {
                        doc.replace_with(current, p);
                        current = p;
                        elements_to_score.push(current);
                    }
                } else if !has_child_block_element(doc, current) {
                    doc.set_tag(current, "p");
                    elements_to_score.push(current);
                }
            }
            node = doc.next_element(current, false);
        }

        Traversal { elements_to_score, byline, lang }
    }

    fn header_duplicates_title(&self, doc: &Document, id: NodeId) -> bool {
        if !doc.is_tag(id, "h1") && !doc.is_tag(id, "h2") {
            return false;
        }
        text_similarity(self.article_title, &inner_text(doc, id)) > 0.75
    }

    /// Scores every paragraph onto itself, its parent and its grandparent.
    fn score_elements(&self, doc: &Document, elements: &[NodeId]) -> CandidateScores {
        let mut scores = CandidateScores::new();
        for &element in elements {
            if !doc.contains(doc.root(), element) {
                continue;
            }
            let text = inner_text(doc, element);
            if text.chars().count() < MIN_PARAGRAPH_LENGTH {
                continue;
            }

            let score = content_score(&text);
            let targets = std::iter::once(element).chain(doc.ancestors(element, 2));
            for (level, target) in targets.enumerate() {
                if !doc.parent(target).is_some_and(|parent| doc.is_element(parent)) {
                    break;
                }
                let weight = if level < 2 { 1.0 } else { 0.5 };
                scores.add(doc, target, score * weight, self.flags.weight_classes);
            }
        }
        scores.apply_link_density(doc);
        scores
    }

    /// Picks the top candidate, creating one under `<body>` when needed.
    fn select_top(
        &self, doc: &mut Document, scores: &mut CandidateScores, ranked: &[(NodeId, f64)], body: NodeId,
    ) -> (NodeId, bool) {
        let Some(&(mut top, top_score)) = ranked.first().filter(|(id, _)| *id != body) else {
            let created = doc.create_element("div");
            doc.move_children(body, created);
            doc.append_child(body, created);
            scores.initialize(doc, created, self.flags.weight_classes);
            return (created, true);
        };

        let alternative_ancestors: Vec<Vec<NodeId>> = ranked
            .iter()
            .skip(1)
            .filter(|(_, score)| top_score != 0.0 && score / top_score >= 0.75)
            .map(|(id, _)| doc.ancestors(*id, 0))
            .collect();

        if alternative_ancestors.len() >= MINIMUM_TOP_CANDIDATES {
            let mut parent = doc.parent(top);
            while let Some(ancestor) = parent
                && doc.is_element(ancestor)
                && ancestor != body
            {
                let lists = alternative_ancestors.iter().filter(|list| list.contains(&ancestor)).count();
                if lists >= MINIMUM_TOP_CANDIDATES {
                    top = ancestor;
                    break;
                }
                parent = doc.parent(ancestor);
            }
        }
        scores.initialize(doc, top, self.flags.weight_classes);

        let mut last_score = scores.get(top).unwrap_or(0.0);
        let score_threshold = last_score / 3.0;
        let mut parent = doc.parent(top);
        while let Some(ancestor) = parent
            && doc.is_element(ancestor)
            && ancestor != body
        {
            let Some(parent_score) = scores.get(ancestor) else {
                parent = doc.parent(ancestor);
                continue;
            };
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top = ancestor;
                break;
            }
            last_score = parent_score;
            parent = doc.parent(ancestor);
        }

        while let Some(ancestor) = doc.parent(top)
            && doc.is_element(ancestor)
            && ancestor != body
            && doc.element_children(ancestor).len() == 1
        {
            top = ancestor;
        }
        scores.initialize(doc, top, self.flags.weight_classes);

        (top, false)
    }

    /// Builds the article around the top candidate (or `choice`) and cleans it.
    fn assemble(
        &self, mut doc: Document, mut scores: CandidateScores, ranked: &[(NodeId, f64)], choice: Option<NodeId>,
    ) -> Option<Assembled> {
        let body = doc.body()?;
        let (top, created) = match choice {
            Some(alternative) => {
                scores.initialize(&doc, alternative, self.flags.weight_classes);
                (alternative, false)
            }
            None => self.select_top(&mut doc, &mut scores, ranked, body),
        };

        let article = doc.create_element("div");
        let parent_of_top = doc.parent(top);
        let top_score = scores.get(top).unwrap_or(0.0);

        match parent_of_top {
            Some(parent) => {
                let threshold = f64::max(10.0, top_score * 0.2);
                let top_class = doc.class_name(top).to_string();
                for sibling in doc.element_children(parent) {
                    if !self.should_append_sibling(&doc, &scores, sibling, top, &top_class, top_score, threshold) {
                        continue;
                    }
                    if doc.tag_name(sibling).is_some_and(|tag| !ALTER_TO_DIV_EXCEPTIONS.contains(&tag)) {
                        doc.set_tag(sibling, "div");
                    }
                    doc.append_child(article, sibling);
                }
            }
            None => doc.append_child(article, top),
        }

        let heading = ["h1", "h2"].iter().find_map(|tag| {
            doc.elements_by_tag(article, &[*tag])
                .into_iter()
                .map(|h| inner_text(&doc, h))
                .find(|text| !text.is_empty())
        });

        self.prep_article(&mut doc, article);

        if created {
            doc.set_attr(top, "id", "readability-page-1");
            doc.set_attr(top, "class", "page");
        } else {
            let page = doc.create_element("div");
            doc.set_attr(page, "id", "readability-page-1");
            doc.set_attr(page, "class", "page");
            doc.move_children(article, page);
            doc.append_child(article, page);
        }

        let text_length = text_length(&doc, article);
        let dir = parent_of_top.and_then(|parent| {
            [parent, top]
                .into_iter()
                .chain(doc.ancestors(parent, 0))
                .find_map(|node| doc.attr(node, "dir").map(str::trim).filter(|d| !d.is_empty()).map(str::to_string))
        });

        Some(Assembled { doc, content: article, dir, heading, text_length })
    }

    #[allow(clippy::too_many_arguments)]
    fn should_append_sibling(
        &self, doc: &Document, scores: &CandidateScores, sibling: NodeId, top: NodeId, top_class: &str,
        top_score: f64, threshold: f64,
    ) -> bool {
        if sibling == top {
            return true;
        }

        let bonus = if !top_class.is_empty() && doc.class_name(sibling) == top_class { top_score * 0.2 } else { 0.0 };
        if let Some(score) = scores.get(sibling)
            && score + bonus >= threshold
        {
            return true;
        }

        if !doc.is_tag(sibling, "p") {
            return false;
        }
        let density = link_density(doc, sibling);
        let text = inner_text(doc, sibling);
        let length = text.chars().count();
        if length > 80 && density < 0.25 {
            return true;
        }
        length > 0 && length < 80 && density == 0.0 && (text.contains(". ") || text.ends_with('.'))
    }

    /// Cleanup passes over the assembled article, in order.
    fn prep_article(&self, doc: &mut Document, article: NodeId) {
        clean_styles(doc, article);
        let data_tables = mark_data_tables(doc, article);
        fix_lazy_images(doc, article);

        self.clean_conditionally(doc, article, "form", &data_tables);
        self.clean_conditionally(doc, article, "fieldset", &data_tables);
        for tag in ["object", "embed", "footer", "link", "aside"] {
            self.clean(doc, article, tag);
        }

        for child in doc.element_children(article) {
            clean_matched_nodes(doc, child, |doc, node, match_string| {
                SHARE_ELEMENTS.is_match(match_string) && doc.text_content(node).chars().count() < SHARE_ELEMENT_THRESHOLD
            });
        }

        for tag in ["iframe", "input", "textarea", "select", "button"] {
            self.clean(doc, article, tag);
        }
        self.clean_headers(doc, article);

        for tag in ["table", "ul", "div"] {
            self.clean_conditionally(doc, article, tag, &data_tables);
        }

        for h1 in doc.elements_by_tag(article, &["h1"]) {
            doc.set_tag(h1, "h2");
        }

        for p in doc.elements_by_tag(article, &["p"]).into_iter().rev() {
            let media = doc.elements_by_tag(p, &["img", "embed", "object", "iframe"]).len();
            if media == 0 && doc.text_content(p).trim().is_empty() {
                doc.remove(p);
            }
        }

        for br in doc.elements_by_tag(article, &["br"]) {
            let next = next_non_whitespace(doc, doc.next_sibling(br));
            if next.is_some_and(|n| doc.is_tag(n, "p")) {
                doc.remove(br);
            }
        }

        flatten_single_cell_tables(doc, article);
    }

    fn is_allowed_embed(&self, doc: &Document, id: NodeId) -> bool {
        let regex = &self.config.allowed_video_regex;
        doc.attrs(id).iter().any(|(_, value)| regex.is_match(value))
            || (doc.is_tag(id, "object") && regex.is_match(&doc.inner_html(id)))
    }

    /// Removes every `tag` element, except embeds of allowed videos.
    fn clean(&self, doc: &mut Document, scope: NodeId, tag: &str) {
        let is_embed = matches!(tag, "object" | "embed" | "iframe");
        for node in doc.elements_by_tag(scope, &[tag]).into_iter().rev() {
            if is_embed && self.is_allowed_embed(doc, node) {
                continue;
            }
            doc.remove(node);
        }
    }

    fn clean_headers(&self, doc: &mut Document, scope: NodeId) {
        for heading in doc.elements_by_tag(scope, &["h1", "h2"]).into_iter().rev() {
            if class_weight(doc, heading, self.flags.weight_classes) < 0.0 {
                if self.config.debug {
                    debug!(target: "legible", node = %heading, "removing header with negative class weight");
                }
                doc.remove(heading);
            }
        }
    }

    fn clean_conditionally(&self, doc: &mut Document, scope: NodeId, tag: &str, data_tables: &HashSet<NodeId>) {
        if !self.flags.clean_conditionally {
            return;
        }
        for node in doc.elements_by_tag(scope, &[tag]).into_iter().rev() {
            if let Some(reason) = self.conditional_removal(doc, node, tag, data_tables) {
                if self.config.debug {
                    debug!(target: "legible", node = %node, tag, reason, "cleaning conditionally");
                }
                doc.remove(node);
            }
        }
    }

    /// Reason to drop a `table`/`ul`/`div`/`form`, or `None` to keep it.
    fn conditional_removal(
        &self, doc: &Document, node: NodeId, tag: &str, data_tables: &HashSet<NodeId>,
    ) -> Option<&'static str> {
        let inner = inner_text(doc, node);
        let content_length = inner.chars().count();

        let mut is_list = matches!(tag, "ul" | "ol");
        if !is_list && content_length > 0 {
            let list_length: usize = doc
                .elements_by_tag(node, &["ul", "ol"])
                .into_iter()
                .map(|list| text_length(doc, list))
                .sum();
            is_list = list_length as f64 / content_length as f64 > 0.9;
        }

        if tag == "table" && data_tables.contains(&node) {
            return None;
        }
        if doc
            .ancestors(node, 0)
            .into_iter()
            .any(|a| doc.is_tag(a, "table") && data_tables.contains(&a))
        {
            return None;
        }
        if doc.has_ancestor_tag(node, "code") {
            return None;
        }
        if doc.elements_by_tag(node, &["table"]).iter().any(|t| data_tables.contains(t)) {
            return None;
        }

        let weight = class_weight(doc, node, self.flags.weight_classes);
        if weight < 0.0 {
            return Some("negative class weight");
        }
        if inner.matches(',').count() >= 10 {
            return None;
        }

        let p = doc.elements_by_tag(node, &["p"]).len() as f64;
        let img = doc.elements_by_tag(node, &["img"]).len() as f64;
        let li = doc.elements_by_tag(node, &["li"]).len() as f64 - 100.0;
        let input = doc.elements_by_tag(node, &["input"]).len() as f64;
        let heading_density = text_density(doc, node, HEADINGS);

        let mut embed_count = 0;
        for embed in doc.elements_by_tag(node, &["object", "embed", "iframe"]) {
            if self.is_allowed_embed(doc, embed) {
                return None;
            }
            embed_count += 1;
        }

        if AD_WORDS.is_match(&inner) || LOADING_WORDS.is_match(&inner) {
            return Some("ad or loading placeholder");
        }

        let density = link_density(doc, node);
        let mut textish: Vec<&str> = vec!["span", "li", "td"];
        textish.extend_from_slice(DIV_TO_P_ELEMS);
        let textish_density = text_density(doc, node, &textish);
        let is_figure_child = doc.has_ancestor_tag(node, "figure");
        let modifier = self.config.link_density_modifier;

        let reason = if !is_figure_child && img > 1.0 && p / img < 0.5 {
            Some("bad p to img ratio")
        } else if !is_list && li > p {
            Some("too many li elements outside of a list")
        } else if input > (p / 3.0).floor() {
            Some("too many inputs per p")
        } else if !is_list
            && !is_figure_child
            && heading_density < 0.9
            && content_length < 25
            && (img == 0.0 || img > 2.0)
            && density > 0.0
        {
            Some("suspiciously short")
        } else if !is_list && weight < 25.0 && density > 0.2 + modifier {
            Some("low weight and a little linky")
        } else if weight >= 25.0 && density > 0.5 + modifier {
            Some("high weight and mostly links")
        } else if (embed_count == 1 && content_length < 75) || embed_count > 1 {
            Some("suspicious embed")
        } else if img == 0.0 && textish_density == 0.0 {
            Some("no useful content")
        } else {
            None
        };

        if is_list && reason.is_some() {
            if doc.element_children(node).iter().any(|child| doc.element_children(*child).len() > 1) {
                return reason;
            }
            let li_count = doc.elements_by_tag(node, &["li"]).len() as f64;
            if img == li_count {
                return None;
            }
        }
        reason
    }
}

struct Assembled {
    doc: Document,
    content: NodeId,
    dir: Option<String>,
    heading: Option<String>,
    text_length: usize,
}

/// Trimmed text of a byline-like element shorter than 100 characters.
fn valid_byline(doc: &Document, id: NodeId, match_string: &str) -> Option<String> {
    let is_byline = doc.attr(id, "rel") == Some("author")
        || doc.attr(id, "itemprop").is_some_and(|v| v.contains("author"))
        || BYLINE.is_match(match_string);
    if !is_byline {
        return None;
    }
    let text = doc.text_content(id).trim().to_string();
    let length = text.chars().count();
    (length > 0 && length < 100).then_some(text)
}

pub(crate) fn is_element_without_content(doc: &Document, id: NodeId) -> bool {
    if !doc.text_content(id).trim().is_empty() {
        return false;
    }
    let children = doc.element_children(id).len();
    children == 0 || children == doc.elements_by_tag(id, &["br", "hr"]).len()
}

fn has_child_block_element(doc: &Document, id: NodeId) -> bool {
    !doc.elements_by_tag(id, DIV_TO_P_ELEMS).is_empty()
}

/// Wraps each run of phrasing children of a `div` into a `<p>`.
fn wrap_phrasing_runs(doc: &mut Document, div: NodeId) {
    let mut paragraph: Option<NodeId> = None;
    for child in doc.children(div).to_vec() {
        if is_phrasing_content(doc, child) {
            match paragraph {
                Some(p) => doc.append_child(p, child),
                None if !is_whitespace_node(doc, child) => {
                    let p = doc.create_element("p");
                    doc.replace_with(child, p);
                    doc.append_child(p, child);
                    paragraph = Some(p);
                }
                None => {}
            }
        } else if let Some(p) = paragraph.take() {
            while let Some(last) = doc.last_child(p)
                && is_whitespace_node(doc, last)
            {
                doc.remove(last);
            }
        }
    }
}

fn next_non_whitespace(doc: &Document, start: Option<NodeId>) -> Option<NodeId> {
    let mut next = start;
    while let Some(node) = next {
        if doc.is_element(node) || !doc.text(node).is_some_and(|t| t.trim().is_empty()) {
            break;
        }
        next = doc.next_sibling(node);
    }
    next
}

/// Strips presentational attributes below `scope`, leaving `<svg>` alone.
fn clean_styles(doc: &mut Document, scope: NodeId) {
    let mut stack = vec![scope];
    while let Some(node) = stack.pop() {
        let Some(tag) = doc.tag_name(node).map(str::to_string) else { continue };
        if tag == "svg" {
            continue;
        }
        for attr in PRESENTATIONAL_ATTRIBUTES {
            doc.remove_attr(node, attr);
        }
        if DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(&tag.as_str()) {
            doc.remove_attr(node, "width");
            doc.remove_attr(node, "height");
        }
        stack.extend(doc.element_children(node));
    }
}

fn row_and_column_count(doc: &Document, table: NodeId) -> (usize, usize) {
    let span = |value: Option<&str>| value.and_then(|v| v.trim().parse::<usize>().ok()).filter(|n| *n > 0).unwrap_or(1);

    let mut rows = 0;
    let mut columns = 0;
    for tr in doc.elements_by_tag(table, &["tr"]) {
        rows += span(doc.attr(tr, "rowspan"));
        let in_row: usize = doc
            .elements_by_tag(tr, &["td"])
            .into_iter()
            .map(|cell| span(doc.attr(cell, "colspan")))
            .sum();
        columns = columns.max(in_row);
    }
    (rows, columns)
}

/// Tables below `scope` that look like data rather than layout.
fn mark_data_tables(doc: &Document, scope: NodeId) -> HashSet<NodeId> {
    let mut data_tables = HashSet::new();
    for table in doc.elements_by_tag(scope, &["table"]) {
        if doc.attr(table, "role") == Some("presentation") || doc.attr(table, "datatable") == Some("0") {
            continue;
        }
        if doc.attr(table, "summary").is_some_and(|s| !s.is_empty()) {
            data_tables.insert(table);
            continue;
        }
        if doc
            .elements_by_tag(table, &["caption"])
            .first()
            .is_some_and(|caption| !doc.children(*caption).is_empty())
        {
            data_tables.insert(table);
            continue;
        }
        if !doc.elements_by_tag(table, &["col", "colgroup", "tfoot", "thead", "th"]).is_empty() {
            data_tables.insert(table);
            continue;
        }
        if !doc.elements_by_tag(table, &["table"]).is_empty() {
            continue;
        }

        let (rows, columns) = row_and_column_count(doc, table);
        if rows == 1 || columns == 1 {
            continue;
        }
        if rows >= 10 || columns > 4 || rows * columns > 10 {
            data_tables.insert(table);
        }
    }
    data_tables
}

/// Copies lazy-loading sources into `src`/`srcset` and drops tiny base64
/// placeholders.
fn fix_lazy_images(doc: &mut Document, scope: NodeId) {
    for elem in doc.elements_by_tag(scope, &["img", "picture", "figure"]) {
        if let Some(src) = doc.attr(elem, "src").map(str::to_string)
            && let Some(parts) = B64_DATA_URL.captures(&src)
        {
            if &parts[1] == "image/svg+xml" {
                continue;
            }
            let src_could_be_removed = doc
                .attrs(elem)
                .iter()
                .any(|(name, value)| name != "src" && IMAGE_EXTENSION.is_match(value));
            if src_could_be_removed
                && let Some(marker) = BASE64_MARKER.find(&src)
                && src.len().saturating_sub(marker.start() + 7) < 133
            {
                doc.remove_attr(elem, "src");
            }
        }

        let has_source = doc.attr(elem, "src").is_some_and(|s| !s.is_empty())
            || doc.attr(elem, "srcset").is_some_and(|s| !s.is_empty() && s != "null");
        if has_source && !doc.class_name(elem).to_ascii_lowercase().contains("lazy") {
            continue;
        }

        let attrs = doc.attrs(elem).to_vec();
        for (name, value) in attrs {
            if matches!(name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }
            let copy_to = if LAZY_SRCSET.is_match(&value) {
                "srcset"
            } else if LAZY_SRC.is_match(&value) {
                "src"
            } else {
                continue;
            };

            if doc.is_tag(elem, "img") || doc.is_tag(elem, "picture") {
                doc.set_attr(elem, copy_to, &value);
            } else if doc.is_tag(elem, "figure") && doc.elements_by_tag(elem, &["img", "picture"]).is_empty() {
                let img = doc.create_element("img");
                doc.set_attr(img, copy_to, &value);
                doc.append_child(elem, img);
            }
        }
    }
}

/// Removes elements inside `scope` for which `filter(doc, node, "class id")` holds.
fn clean_matched_nodes<F>(doc: &mut Document, scope: NodeId, filter: F)
where
    F: Fn(&Document, NodeId, &str) -> bool,
{
    let end = doc.next_element(scope, true);
    let mut next = doc.next_element(scope, false);
    while let Some(node) = next
        && Some(node) != end
    {
        let match_string = format!("{} {}", doc.class_name(node), doc.id_attr(node));
        next = if filter(doc, node, &match_string) {
            doc.remove_and_get_next(node)
        } else {
            doc.next_element(node, false)
        };
    }
}

/// Replaces tables holding a single cell by that cell.
fn flatten_single_cell_tables(doc: &mut Document, scope: NodeId) {
    for table in doc.elements_by_tag(scope, &["table"]) {
        if doc.parent(table).is_none() {
            continue;
        }
        let body = match doc.first_element_child(table) {
            Some(tbody) if has_single_tag_inside(doc, table, "tbody") => tbody,
            _ => table,
        };
        if !has_single_tag_inside(doc, body, "tr") {
            continue;
        }
        let Some(row) = doc.first_element_child(body) else { continue };
        if !has_single_tag_inside(doc, row, "td") {
            continue;
        }
        let Some(cell) = doc.first_element_child(row) else { continue };
        let phrasing = doc.children(cell).iter().all(|c| is_phrasing_content(doc, *c));
        doc.set_tag(cell, if phrasing { "p" } else { "div" });
        doc.replace_with(table, cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(seed: &str) -> String {
        format!(
            "{seed} is a sentence long enough to be scored, with a comma or two, and it keeps going for a while so that the length bonus applies too."
        )
    }

    fn article_html(paragraphs: usize) -> String {
        let body: String = (0..paragraphs).map(|i| format!("<p>{}</p>", paragraph(&format!("Paragraph {i}")))).collect();
        format!(
            r#"<html lang="en"><head><title>T</title></head><body>
                <div class="nav"><a href="/1">Home</a> <a href="/2">About</a></div>
                <div class="article-body">{body}</div>
            </body></html>"#
        )
    }

    fn config(threshold: usize) -> ExtractConfig {
        ExtractConfig { char_threshold: threshold, ..Default::default() }
    }

    #[test]
    fn test_flags_relax_in_order() {
        let mut flags = Flags::default();
        assert!(flags.relax());
        assert!(!flags.strip_unlikelys && flags.weight_classes && flags.clean_conditionally);
        assert!(flags.relax());
        assert!(!flags.weight_classes && flags.clean_conditionally);
        assert!(flags.relax());
        assert!(!flags.clean_conditionally);
        assert!(!flags.relax());
    }

    #[test]
    fn test_extracts_article_body() {
        let doc = Document::parse(&article_html(6)).unwrap();
        let found = grab_article(&doc, &config(500), "").unwrap();
        let html = found.doc.inner_html(found.content);

        assert!(html.starts_with(r#"<div id="readability-page-1" class="page">"#));
        assert!(html.contains("Paragraph 0"));
        assert!(html.contains("Paragraph 5"));
        assert!(!html.contains("About"));
        assert_eq!(found.lang.as_deref(), Some("en"));
        assert!(found.text_length >= 500);
    }

    #[test]
    fn test_source_document_is_untouched() {
        let doc = Document::parse(&article_html(6)).unwrap();
        let before = doc.to_html();
        grab_article(&doc, &config(500), "").unwrap();
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_rejects_short_content() {
        let doc = Document::parse(&article_html(1)).unwrap();
        assert!(grab_article(&doc, &config(5000), "").is_none());
    }

    #[test]
    fn test_byline_removed_and_captured() {
        let html = format!(
            r#"<body><div class="byline">By Jane Doe</div><div class="content"><p>{}</p><p>{}</p></div></body>"#,
            paragraph("One"),
            paragraph("Two")
        );
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "").unwrap();
        assert_eq!(found.byline.as_deref(), Some("By Jane Doe"));
        assert!(!found.doc.inner_html(found.content).contains("Jane Doe"));
    }

    #[test]
    fn test_title_header_removed() {
        let html = format!(
            r#"<body><div class="content"><h1>Rust Ownership Explained</h1><p>{}</p><p>{}</p></div></body>"#,
            paragraph("One"),
            paragraph("Two")
        );
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "Rust Ownership Explained").unwrap();
        assert!(!found.doc.inner_html(found.content).contains("Ownership Explained"));
    }

    #[test]
    fn test_dir_from_ancestor() {
        let html = format!(
            r#"<body><div dir="rtl"><div class="content"><p>{}</p><p>{}</p></div></div></body>"#,
            paragraph("One"),
            paragraph("Two")
        );
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "").unwrap();
        assert_eq!(found.dir.as_deref(), Some("rtl"));
    }

    #[test]
    fn test_score_propagation_weights() {
        let text = paragraph("Weights");
        let html = format!(r#"<body><div id="g"><div id="p"><p id="c">{text}</p></div></div></body>"#);
        let doc = Document::parse(&html).unwrap();
        let ids = |s: &str| doc.query_selector_all(s).unwrap()[0];
        let (g, p, c) = (ids("#g"), ids("#p"), ids("#c"));

        let cfg = ExtractConfig::default();
        let pass = Pass { config: &cfg, flags: Flags::default(), article_title: "" };
        let scores = pass.score_elements(&doc, &[c]);

        let score = content_score(&inner_text(&doc, c));
        assert!((scores.get(c).unwrap() - score).abs() < 1e-9);
        assert!((scores.get(p).unwrap() - (5.0 + score)).abs() < 1e-9);
        assert!((scores.get(g).unwrap() - (5.0 + score * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_short_paragraphs_are_not_scored() {
        let doc = Document::parse("<body><div><p id=\"c\">Too short.</p></div></body>").unwrap();
        let c = doc.query_selector_all("#c").unwrap()[0];
        let cfg = ExtractConfig::default();
        let pass = Pass { config: &cfg, flags: Flags::default(), article_title: "" };
        assert!(pass.score_elements(&doc, &[c]).is_empty());
    }

    #[test]
    fn test_wrap_phrasing_runs() {
        let mut doc = Document::parse("<div>text <b>bold</b><div>block</div> tail</div>").unwrap();
        let div = doc.query_selector_all("div").unwrap()[0];
        wrap_phrasing_runs(&mut doc, div);
        assert_eq!(doc.inner_html(div), "<p>text <b>bold</b></p><div>block</div><p> tail</p>");
    }

    #[test]
    fn test_clean_styles_skips_svg() {
        let mut doc =
            Document::parse(r#"<div style="x" align="left"><td width="3">c</td><svg style="y"></svg></div>"#).unwrap();
        let div = doc.query_selector_all("div").unwrap()[0];
        clean_styles(&mut doc, div);
        let html = doc.outer_html(div);
        assert!(!html.contains("align"));
        assert!(!html.contains("style=\"x\""));
        assert!(html.contains("style=\"y\""));
    }

    #[test]
    fn test_mark_data_tables() {
        let mut rows = String::new();
        for _ in 0..10 {
            rows.push_str("<tr><td>a</td><td>b</td></tr>");
        }
        let html = format!(
            r#"<div><table id="data">{rows}</table><table id="layout"><tr><td>x</td></tr></table><table id="th"><tr><th>h</th></tr></table></div>"#
        );
        let doc = Document::parse(&html).unwrap();
        let div = doc.query_selector_all("div").unwrap()[0];
        let tables = mark_data_tables(&doc, div);
        let id = |s: &str| doc.query_selector_all(s).unwrap()[0];
        assert!(tables.contains(&id("#data")));
        assert!(!tables.contains(&id("#layout")));
        assert!(tables.contains(&id("#th")));
    }

    #[test]
    fn test_fix_lazy_images() {
        let mut doc =
            Document::parse(r#"<div><img class="lazy" data-src="/a.jpg"><figure data-src="/b.png"></figure></div>"#)
                .unwrap();
        let div = doc.query_selector_all("div").unwrap()[0];
        fix_lazy_images(&mut doc, div);
        assert_eq!(
            doc.inner_html(div),
            r#"<img class="lazy" data-src="/a.jpg" src="/a.jpg"><figure data-src="/b.png"><img src="/b.png"></figure>"#
        );
    }

    #[test]
    fn test_flatten_single_cell_table() {
        let mut doc = Document::parse("<div><table><tbody><tr><td>only <b>cell</b></td></tr></tbody></table></div>").unwrap();
        let div = doc.query_selector_all("div").unwrap()[0];
        flatten_single_cell_tables(&mut doc, div);
        assert_eq!(doc.inner_html(div), "<p>only <b>cell</b></p>");
    }

    #[test]
    fn test_allowed_video_embeds_survive() {
        let text = paragraph("Video");
        let html = format!(
            r#"<body><div class="content"><p>{text}</p><iframe src="https://www.youtube.com/embed/x"></iframe><iframe src="https://ads.example.com/x"></iframe><p>{text}</p></div></body>"#
        );
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "").unwrap();
        let out = found.doc.inner_html(found.content);
        assert!(out.contains("youtube.com/embed/x"));
        assert!(!out.contains("ads.example.com"));
    }

    #[test]
    fn test_conditional_cleaning_drops_link_lists() {
        let text = paragraph("Body");
        let links: String = (0..8).map(|i| format!("<a href=\"/l{i}\">Link number {i}</a> ")).collect();
        let html = format!(r#"<body><div class="content"><p>{text}</p><div>{links}</div><p>{text}</p></div></body>"#);
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "").unwrap();
        assert!(!found.doc.inner_html(found.content).contains("Link number"));
    }

    #[test]
    fn test_unlikely_roles_removed() {
        let text = paragraph("Body");
        let html = format!(
            r#"<body><div role="navigation"><p>{text} navigation</p></div><div class="content"><p>{text}</p><p>{text}</p></div></body>"#
        );
        let doc = Document::parse(&html).unwrap();
        let found = grab_article(&doc, &config(100), "").unwrap();
        assert!(!found.doc.inner_html(found.content).contains("navigation"));
    }

    #[test]
    fn test_unlikely_container_recovered_after_relaxing() {
        let body: String = (0..6).map(|i| format!("<p>{}</p>", paragraph(&format!("Remark {i}")))).collect();
        let html = format!(r#"<body><div class="sidebar comment">{body}</div></body>"#);
        let doc = Document::parse(&html).unwrap();
        let cfg = config(500);

        let strict = Pass { config: &cfg, flags: Flags::default(), article_title: "" };
        assert!(strict.run(doc.clone()).is_none());

        let found = grab_article(&doc, &cfg, "").unwrap();
        assert!(!found.flags.strip_unlikelys);
        let html = found.doc.inner_html(found.content);
        assert!(html.contains("Remark 0"));
        assert!(html.contains("Remark 5"));
    }

    #[test]
    fn test_short_top_candidate_falls_back_to_runner_up() {
        let dense = format!("<p>{}</p>", "alpha, ".repeat(25)).repeat(2);
        let prose: String = (0..8).map(|i| format!("<p>{}</p>", paragraph(&format!("Prose {i}")))).collect();
        let html = format!(
            r#"<body><div><div><div id="dense">{dense}</div></div></div><div><div><div id="prose">{prose}</div></div></div></body>"#
        );
        let doc = Document::parse(&html).unwrap();
        let cfg = config(500);

        let pass = Pass { config: &cfg, flags: Flags::default(), article_title: "" };
        let mut prepared = doc.clone();
        let traversal = pass.prepare_nodes(&mut prepared);
        let scores = pass.score_elements(&prepared, &traversal.elements_to_score);
        let ranked = scores.top_candidates(&prepared, cfg.nb_top_candidates);
        let dense_id = prepared.query_selector_all("#dense").unwrap()[0];
        let prose_id = prepared.query_selector_all("#prose").unwrap()[0];
        assert_eq!(ranked[0].0, dense_id);
        assert!(ranked.iter().any(|(id, _)| *id == prose_id));

        let found = grab_article(&doc, &cfg, "").unwrap();
        assert_eq!(found.flags, Flags::default());
        let html = found.doc.inner_html(found.content);
        assert!(html.contains("Prose 0"));
        assert!(html.contains("Prose 7"));
        assert!(!html.contains("alpha"));
        assert!(found.text_length >= 500);
    }
}
