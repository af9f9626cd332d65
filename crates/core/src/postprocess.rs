//! Cleanup of the extracted article after acceptance.

use crate::dom_tree::{Document, NodeId};
use crate::extract::is_element_without_content;
use crate::preprocess::has_single_tag_inside;

/// Classes kept on every element regardless of configuration.
pub const CLASSES_TO_PRESERVE: &[&str] = &["page"];

/// Configuration for article post-processing
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to collapse nested `div`/`section` wrappers
    pub simplify_nested: bool,
    /// Whether to keep class attributes (default: false)
    pub keep_classes: bool,
    /// Classes kept in addition to [`CLASSES_TO_PRESERVE`]
    pub classes_to_preserve: Vec<String>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self { simplify_nested: true, keep_classes: false, classes_to_preserve: Vec::new() }
    }
}

/// Post-processes the article rooted at `content` in place.
///
/// # Example
///
/// ```rust
/// use legible_core::Document;
/// use legible_core::postprocess::{PostProcessConfig, postprocess_article};
///
/// let mut doc = Document::parse(r#"<div class="a keep"><section class="b"><p>Hi</p></section></div>"#).unwrap();
/// let content = doc.create_element("div");
/// let body = doc.body().unwrap();
/// doc.move_children(body, content);
///
/// let config = PostProcessConfig { classes_to_preserve: vec!["keep".into()], ..Default::default() };
/// postprocess_article(&mut doc, content, &config);
/// assert_eq!(doc.inner_html(content), r#"<section class="keep"><p>Hi</p></section>"#);
/// ```
pub fn postprocess_article(doc: &mut Document, content: NodeId, config: &PostProcessConfig) {
    if config.simplify_nested {
        simplify_nested_elements(doc, content);
    }
    if !config.keep_classes {
        clean_classes(doc, content, &config.classes_to_preserve);
    }
}

/// Removes empty `div`/`section` wrappers and replaces those holding a
/// single `div`/`section` by that child, which inherits their attributes.
///
/// Elements whose id starts with `readability` are left alone.
pub fn simplify_nested_elements(doc: &mut Document, content: NodeId) {
    let mut node = Some(content);
    while let Some(current) = node {
        let wrapper = doc.parent(current).is_some()
            && (doc.is_tag(current, "div") || doc.is_tag(current, "section"))
            && !doc.id_attr(current).starts_with("readability");

        if wrapper {
            if is_element_without_content(doc, current) {
                node = doc.remove_and_get_next(current);
                continue;
            }
            if (has_single_tag_inside(doc, current, "div") || has_single_tag_inside(doc, current, "section"))
                && let Some(child) = doc.first_element_child(current)
            {
                for (name, value) in doc.attrs(current).to_vec() {
                    doc.set_attr(child, &name, &value);
                }
                doc.replace_with(current, child);
                node = Some(child);
                continue;
            }
        }
        node = doc.next_element(current, false);
    }
}

/// Drops every class outside [`CLASSES_TO_PRESERVE`] and `preserve`,
/// removing the attribute when nothing is left.
pub fn clean_classes(doc: &mut Document, content: NodeId, preserve: &[String]) {
    let keep = |class: &str| CLASSES_TO_PRESERVE.contains(&class) || preserve.iter().any(|p| p == class);

    let mut nodes = vec![content];
    nodes.extend(doc.descendants(content));
    for node in nodes {
        if !doc.has_attr(node, "class") {
            continue;
        }
        let kept: Vec<String> = doc.class_list(node).into_iter().filter(|c| keep(*c)).map(str::to_string).collect();
        if kept.is_empty() {
            doc.remove_attr(node, "class");
        } else {
            doc.set_attr(node, "class", &kept.join(" "));
        }
    }
}
