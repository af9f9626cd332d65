//! Document sanitizer.
//!
//! Runs over the arena DOM before scoring: strips scripts, styles, comments
//! and hidden elements, promotes `<noscript>` images, drops tracking pixels,
//! collapses `<br>` runs into paragraphs and resolves relative URIs. Every
//! pass is idempotent, so sanitizing an already sanitized document is a
//! no-op.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use crate::dom_tree::{Document, NodeData, NodeId};
use crate::scoring::link_density;

/// Configuration for document sanitizing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script and noscript tags
    pub remove_scripts: bool,
    /// Whether to remove style and link tags
    pub remove_styles: bool,
    /// Whether to remove comment nodes
    pub remove_comments: bool,
    /// Whether to remove elements hidden by style, `hidden` or `aria-hidden`
    pub remove_hidden: bool,
    /// Whether to promote images found inside noscript tags
    pub unwrap_noscript_images: bool,
    /// Whether to remove 1x1 images
    pub remove_tracking_pixels: bool,
    /// Whether to turn `<br><br>` runs into paragraphs
    pub collapse_brs: bool,
    /// Whether to unwrap divs holding a single paragraph
    pub unwrap_wrappers: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_comments: true,
            remove_hidden: true,
            unwrap_noscript_images: true,
            remove_tracking_pixels: true,
            collapse_brs: true,
            unwrap_wrappers: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

const PHRASING_ELEMS: &[&str] = &[
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em", "embed", "i", "img",
    "input", "kbd", "label", "mark", "math", "meter", "noscript", "object", "output", "progress", "q", "ruby", "samp",
    "script", "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "var", "wbr",
];

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").unwrap());

static SRCSET_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))").unwrap());

/// Sanitizes `doc` in place.
///
/// # Example
///
/// ```rust
/// use legible_core::{Document, PreprocessConfig, preprocess_document};
///
/// let mut doc = Document::parse("<body><script>x()</script><p>Text<!-- note --></p></body>").unwrap();
/// preprocess_document(&mut doc, &PreprocessConfig::default());
/// assert_eq!(doc.inner_html(doc.body().unwrap()), "<p>Text</p>");
/// ```
pub fn preprocess_document(doc: &mut Document, config: &PreprocessConfig) {
    let root = doc.root();

    if config.unwrap_noscript_images {
        unwrap_noscript_images(doc);
    }
    if config.remove_scripts {
        remove_tags(doc, root, &["script", "noscript"]);
    }
    if config.remove_styles {
        remove_tags(doc, root, &["style", "link"]);
    }
    if config.remove_comments {
        remove_comments(doc);
    }
    if config.remove_hidden {
        remove_hidden_elements(doc);
    }
    if config.remove_tracking_pixels {
        remove_tracking_pixels(doc);
    }

    for font in doc.elements_by_tag(root, &["font"]) {
        doc.set_tag(font, "span");
    }

    if config.collapse_brs
        && let Some(body) = doc.body()
    {
        replace_brs(doc, body);
    }
    if config.unwrap_wrappers {
        unwrap_single_paragraph_divs(doc);
    }
    if config.convert_urls {
        fix_relative_uris(doc, root, config.base_url.as_ref());
    }
}

pub(crate) fn is_document_root(doc: &Document, id: NodeId) -> bool {
    id == doc.root() || Some(id) == doc.html_element() || Some(id) == doc.body()
}

/// Detaches `id` unless it is the document node, `<html>` or `<body>`.
pub(crate) fn safe_remove(doc: &mut Document, id: NodeId) -> bool {
    if is_document_root(doc, id) {
        trace!(target: "legible", node = %id, "refusing to remove document root");
        return false;
    }
    doc.remove(id);
    true
}

/// Removes every descendant of `scope` with one of the given tags.
pub(crate) fn remove_tags(doc: &mut Document, scope: NodeId, tags: &[&str]) {
    for node in doc.elements_by_tag(scope, tags) {
        safe_remove(doc, node);
    }
}

fn remove_comments(doc: &mut Document) {
    let comments: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|n| matches!(doc.data(*n), NodeData::Comment(_)))
        .collect();
    for comment in comments {
        doc.remove(comment);
    }
}

/// Reads one declaration out of an inline `style` attribute.
fn style_value(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|declaration| {
        let (name, value) = declaration.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(property)
            .then(|| value.trim().trim_end_matches("!important").trim().to_ascii_lowercase())
    })
}

/// Whether an element is visible according to its inline style and hiding attributes.
pub fn is_probably_visible(doc: &Document, id: NodeId) -> bool {
    if let Some(style) = doc.attr(id, "style") {
        if style_value(style, "display").as_deref() == Some("none") {
            return false;
        }
        if style_value(style, "visibility").as_deref() == Some("hidden") {
            return false;
        }
    }
    if doc.has_attr(id, "hidden") {
        return false;
    }
    doc.attr(id, "aria-hidden") != Some("true") || doc.has_class(id, "fallback-image")
}

fn remove_hidden_elements(doc: &mut Document) {
    let mut node = doc.html_element();
    while let Some(current) = node {
        node = if !is_probably_visible(doc, current) && !is_document_root(doc, current) {
            doc.remove_and_get_next(current)
        } else {
            doc.next_element(current, false)
        };
    }
}

fn pixel_size(value: Option<&str>) -> Option<f64> {
    value?.trim().trim_end_matches("px").trim().parse::<f64>().ok()
}

fn remove_tracking_pixels(doc: &mut Document) {
    for img in doc.elements_by_tag(doc.root(), &["img"]) {
        let width = pixel_size(doc.attr(img, "width"));
        let height = pixel_size(doc.attr(img, "height"));
        if let (Some(w), Some(h)) = (width, height)
            && w <= 1.0
            && h <= 1.0
        {
            doc.remove(img);
        }
    }
}

/// Whether the element is an `<img>` or wraps exactly one with no text around it.
fn is_single_image(doc: &Document, id: NodeId) -> bool {
    let mut current = id;
    loop {
        if doc.is_tag(current, "img") {
            return true;
        }
        let children = doc.element_children(current);
        if children.len() != 1 || !doc.text_content(current).trim().is_empty() {
            return false;
        }
        current = children[0];
    }
}

fn unwrap_noscript_images(doc: &mut Document) {
    let root = doc.root();

    for img in doc.elements_by_tag(root, &["img"]) {
        let has_source = doc.attrs(img).iter().any(|(name, value)| {
            matches!(name.as_str(), "src" | "srcset" | "data-src" | "data-srcset") || IMAGE_EXTENSION.is_match(value)
        });
        if !has_source {
            doc.remove(img);
        }
    }

    for noscript in doc.elements_by_tag(root, &["noscript"]) {
        let Some(parent) = doc.parent(noscript) else { continue };

        // Scripting-enabled parsing leaves noscript content as raw text.
        let markup = if doc.element_children(noscript).is_empty() {
            doc.text_content(noscript)
        } else {
            doc.inner_html(noscript)
        };
        let holder = doc.create_element("div");
        doc.set_inner_html(holder, &markup);
        if !is_single_image(doc, holder) {
            continue;
        }
        let Some(replacement) = doc.first_element_child(holder) else { continue };
        let Some(new_img) = doc.elements_by_tag(holder, &["img"]).into_iter().next() else { continue };

        match doc.previous_element_sibling(noscript) {
            Some(previous) if is_single_image(doc, previous) => {
                let previous_img = if doc.is_tag(previous, "img") {
                    Some(previous)
                } else {
                    doc.elements_by_tag(previous, &["img"]).into_iter().next()
                };
                if let Some(previous_img) = previous_img {
                    for (name, value) in doc.attrs(previous_img).to_vec() {
                        if value.is_empty() {
                            continue;
                        }
                        if name == "src" || name == "srcset" || IMAGE_EXTENSION.is_match(&value) {
                            if doc.attr(new_img, &name) == Some(value.as_str()) {
                                continue;
                            }
                            let target = if doc.has_attr(new_img, &name) { format!("data-old-{name}") } else { name };
                            doc.set_attr(new_img, &target, &value);
                        }
                    }
                }
                doc.replace_with(previous, replacement);
            }
            Some(previous) if doc.is_tag(previous, "img") => {}
            _ => doc.insert_before(parent, replacement, noscript),
        }
    }
}

/// Skips whitespace-only text and comment siblings.
pub(crate) fn next_significant(doc: &Document, start: Option<NodeId>) -> Option<NodeId> {
    let mut next = start;
    while let Some(node) = next {
        if doc.is_element(node) || !doc.text_content(node).trim().is_empty() {
            break;
        }
        next = doc.next_sibling(node);
    }
    next
}

/// Text nodes and inline elements that may sit inside a paragraph.
pub(crate) fn is_phrasing_content(doc: &Document, id: NodeId) -> bool {
    match doc.data(id) {
        NodeData::Text(_) => true,
        NodeData::Element(el) => {
            PHRASING_ELEMS.contains(&el.name.as_str())
                || (matches!(el.name.as_str(), "a" | "del" | "ins")
                    && doc.children(id).iter().all(|c| is_phrasing_content(doc, *c)))
        }
        _ => false,
    }
}

/// Whitespace-only text or a `<br>`.
pub(crate) fn is_whitespace_node(doc: &Document, id: NodeId) -> bool {
    match doc.data(id) {
        NodeData::Text(text) => text.trim().is_empty(),
        _ => doc.is_tag(id, "br"),
    }
}

/// Turns runs of two or more `<br>` into paragraphs holding the phrasing
/// content that follows them.
pub(crate) fn replace_brs(doc: &mut Document, scope: NodeId) {
    for br in doc.elements_by_tag(scope, &["br"]) {
        if doc.parent(br).is_none() {
            continue;
        }

        let mut next = doc.next_sibling(br);
        let mut replaced = false;
        loop {
            match next_significant(doc, next) {
                Some(node) if doc.is_tag(node, "br") => {
                    replaced = true;
                    next = doc.next_sibling(node);
                    doc.remove(node);
                }
                _ => break,
            }
        }
        if !replaced {
            continue;
        }

        let p = doc.create_element("p");
        doc.replace_with(br, p);

        let mut next = doc.next_sibling(p);
        while let Some(node) = next {
            if doc.is_tag(node, "br")
                && let Some(after) = next_significant(doc, doc.next_sibling(node))
                && doc.is_tag(after, "br")
            {
                break;
            }
            if !is_phrasing_content(doc, node) {
                break;
            }
            next = doc.next_sibling(node);
            doc.append_child(p, node);
        }

        while let Some(last) = doc.last_child(p)
            && is_whitespace_node(doc, last)
        {
            doc.remove(last);
        }

        if let Some(parent) = doc.parent(p)
            && doc.is_tag(parent, "p")
        {
            doc.set_tag(parent, "div");
        }
    }
}

/// An element whose only child element has the given tag and which carries
/// no text of its own.
pub(crate) fn has_single_tag_inside(doc: &Document, id: NodeId, tag: &str) -> bool {
    let children = doc.element_children(id);
    if children.len() != 1 || !doc.is_tag(children[0], tag) {
        return false;
    }
    !doc
        .children(id)
        .iter()
        .any(|c| doc.text(*c).is_some_and(|t| !t.trim().is_empty()))
}

/// Replaces a `<div>` wrapping a single low-link-density `<p>` by that paragraph.
pub(crate) fn unwrap_single_paragraph_divs(doc: &mut Document) {
    let Some(body) = doc.body() else { return };
    for div in doc.elements_by_tag(body, &["div"]) {
        if doc.parent(div).is_none() || !has_single_tag_inside(doc, div, "p") || link_density(doc, div) >= 0.25 {
            continue;
        }
        if let Some(p) = doc.first_element_child(div) {
            doc.replace_with(div, p);
        }
    }
}

fn document_base(doc: &Document, base_url: Option<&Url>) -> Option<Url> {
    let declared = doc
        .elements_by_tag(doc.root(), &["base"])
        .into_iter()
        .find_map(|base| doc.attr(base, "href").map(str::to_string));

    match (declared, base_url) {
        (Some(href), Some(base)) => base.join(&href).ok().or_else(|| Some(base.clone())),
        (Some(href), None) => Url::parse(&href).ok(),
        (None, base) => base.cloned(),
    }
}

/// Resolves relative `href`, `src`, `poster` and `srcset` values under
/// `scope` and replaces `javascript:` links by their content.
pub(crate) fn fix_relative_uris(doc: &mut Document, scope: NodeId, base_url: Option<&Url>) {
    let has_base_element = !doc.elements_by_tag(doc.root(), &["base"]).is_empty();
    let base = document_base(doc, base_url);
    let absolute = |uri: &str| -> String {
        if uri.starts_with('#') && !has_base_element {
            return uri.to_string();
        }
        match &base {
            Some(base) => base.join(uri).map(|u| u.to_string()).unwrap_or_else(|_| uri.to_string()),
            None => uri.to_string(),
        }
    };

    for link in doc.elements_by_tag(scope, &["a"]) {
        let Some(href) = doc.attr(link, "href").map(str::to_string) else { continue };
        if href.trim_start().to_ascii_lowercase().starts_with("javascript:") {
            let children = doc.children(link).to_vec();
            if children.len() == 1 && doc.is_text(children[0]) {
                let text = doc.create_text(&doc.text_content(link));
                doc.replace_with(link, text);
            } else {
                let span = doc.create_element("span");
                doc.move_children(link, span);
                doc.replace_with(link, span);
            }
        } else {
            doc.set_attr(link, "href", &absolute(&href));
        }
    }

    for media in doc.elements_by_tag(scope, &["img", "picture", "figure", "video", "audio", "source"]) {
        for name in ["src", "poster"] {
            if let Some(value) = doc.attr(media, name).map(str::to_string) {
                doc.set_attr(media, name, &absolute(&value));
            }
        }
        if let Some(srcset) = doc.attr(media, "srcset").map(str::to_string) {
            let rewritten = SRCSET_URL.replace_all(&srcset, |caps: &regex::Captures<'_>| {
                format!(
                    "{}{}{}",
                    absolute(&caps[1]),
                    caps.get(2).map_or("", |m| m.as_str()),
                    &caps[3]
                )
            });
            doc.set_attr(media, "srcset", &rewritten);
        }
    }
}
