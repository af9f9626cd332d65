//! Main content extraction API.
//!
//! This module provides the primary API for extracting readable content
//! from HTML pages. The main entry point is the [`Readability`] struct,
//! along with the convenience function [`parse`].
//!
//! # Example
//!
//! ```rust
//! use legible_core::{ParseOptions, Readability};
//!
//! let paragraph = "Readable prose has sentences, commas, and enough length to matter. ".repeat(5);
//! let html = format!(
//!     "<html><head><title>Notes</title></head><body><article><p>{0}</p><p>{0}</p></article></body></html>",
//!     paragraph
//! );
//!
//! let reader = Readability::with_options(ParseOptions::builder().char_threshold(200).build());
//! let article = reader.parse(html.as_str(), Some("https://example.com/notes")).unwrap().unwrap();
//! assert_eq!(article.title, "Notes");
//! assert!(article.length >= 200);
//! ```

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::article::Article;
use crate::dom_tree::{Document, NodeId};
use crate::extract::{ExtractConfig, ExtractedContent, grab_article};
use crate::metadata::{Metadata, resolve_direction};
use crate::parse::{HtmlSource, parse_html};
use crate::postprocess::{PostProcessConfig, postprocess_article};
use crate::preprocess::{PreprocessConfig, preprocess_document};
use crate::sanitize::sanitize_markup;
use crate::scoring::{VIDEOS, inner_text};
use crate::{LegibleError, Result};

/// Paragraphs shorter than this are not used as an excerpt.
const EXCERPT_MIN_CHARS: usize = 25;

const EXCERPT_MAX_CHARS: usize = 300;

/// Options for a parse.
///
/// # Example
///
/// ```rust
/// use legible_core::ParseOptions;
///
/// let options = ParseOptions::builder()
///     .char_threshold(250)
///     .keep_classes(true)
///     .classes_to_preserve(vec!["caption".to_string()])
///     .build();
/// assert_eq!(options.nb_top_candidates, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Emit diagnostic tracing (default: false).
    pub debug: bool,

    /// Maximum number of elements in the parsed document (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Minimum character count of an accepted article (default: 500).
    pub char_threshold: usize,

    /// Classes kept on the output in addition to `page`.
    pub classes_to_preserve: Vec<String>,

    /// Whether to keep every class attribute in the output (default: false).
    pub keep_classes: bool,

    /// Whether to skip JSON-LD metadata (default: false).
    pub disable_json_ld: bool,

    /// Added to the link density limits of conditional cleaning (default: 0.0).
    pub link_density_modifier: f64,

    /// Embeds matching this survive cleanup. `None` uses the common video hosts.
    pub allowed_video_regex: Option<Regex>,

    /// Whether to strip active content from the markup before parsing (default: false).
    pub sanitize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_elems_to_parse: 0,
            nb_top_candidates: 5,
            char_threshold: 500,
            classes_to_preserve: Vec::new(),
            keep_classes: false,
            disable_json_ld: false,
            link_density_modifier: 0.0,
            allowed_video_regex: None,
            sanitize: false,
        }
    }
}

impl ParseOptions {
    /// Creates a new builder for ParseOptions.
    pub fn builder() -> ParseOptionsBuilder {
        ParseOptionsBuilder::new()
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            char_threshold: self.char_threshold,
            nb_top_candidates: self.nb_top_candidates,
            link_density_modifier: self.link_density_modifier,
            allowed_video_regex: self.allowed_video_regex.clone().unwrap_or_else(|| VIDEOS.clone()),
            debug: self.debug,
        }
    }

    fn postprocess_config(&self) -> PostProcessConfig {
        PostProcessConfig {
            keep_classes: self.keep_classes,
            classes_to_preserve: self.classes_to_preserve.clone(),
            ..Default::default()
        }
    }
}

/// Builder for ParseOptions.
pub struct ParseOptionsBuilder {
    options: ParseOptions,
}

impl ParseOptionsBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { options: ParseOptions::default() }
    }

    pub fn debug(mut self, value: bool) -> Self {
        self.options.debug = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.options.max_elems_to_parse = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.options.nb_top_candidates = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.options.char_threshold = value;
        self
    }

    pub fn classes_to_preserve(mut self, value: Vec<String>) -> Self {
        self.options.classes_to_preserve = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.options.keep_classes = value;
        self
    }

    pub fn disable_json_ld(mut self, value: bool) -> Self {
        self.options.disable_json_ld = value;
        self
    }

    pub fn link_density_modifier(mut self, value: f64) -> Self {
        self.options.link_density_modifier = value;
        self
    }

    pub fn allowed_video_regex(mut self, value: Regex) -> Self {
        self.options.allowed_video_regex = Some(value);
        self
    }

    /// Sets whether to run the markup sanitizer before parsing.
    pub fn sanitize(mut self, value: bool) -> Self {
        self.options.sanitize = value;
        self
    }

    /// Builds the options.
    pub fn build(self) -> ParseOptions {
        self.options
    }
}

impl Default for ParseOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main entry point for content extraction.
///
/// # Example
///
/// ```rust
/// use legible_core::Readability;
///
/// let reader = Readability::new();
/// let article = reader.parse("<html><body><p>Too short to be an article.</p></body></html>", None).unwrap();
/// assert!(article.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    options: ParseOptions,
}

impl Readability {
    /// Creates a reader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Extracts the article from `source`.
    ///
    /// The source document is never modified. Returns `Ok(None)` when no
    /// extraction attempt reaches `char_threshold`.
    ///
    /// # Errors
    ///
    /// - [`LegibleError::InvalidUrl`] when `base_uri` is not an absolute URL
    /// - [`LegibleError::DocumentTooLarge`] when the element count exceeds
    ///   a nonzero `max_elems_to_parse`
    /// - [`LegibleError::MalformedMarkup`] when no document root can be built
    pub fn parse<S: HtmlSource + ?Sized>(&self, source: &S, base_uri: Option<&str>) -> Result<Option<Article>> {
        let base_url = base_uri
            .map(|uri| Url::parse(uri).map_err(|e| LegibleError::InvalidUrl(format!("{uri}: {e}"))))
            .transpose()?;

        let mut doc = self.load(source)?;

        let max = self.options.max_elems_to_parse;
        if max > 0 {
            let count = doc.element_count();
            if count > max {
                return Err(LegibleError::DocumentTooLarge { count, max });
            }
        }

        let metadata = doc.extract_metadata(self.options.disable_json_ld);
        if self.options.debug {
            debug!(target: "legible", ?metadata, "metadata resolved");
        }

        preprocess_document(&mut doc, &PreprocessConfig { base_url, ..Default::default() });

        let article_title = metadata.title.clone().unwrap_or_default();
        let Some(mut extracted) = grab_article(&doc, &self.options.extract_config(), &article_title) else {
            return Ok(None);
        };

        postprocess_article(&mut extracted.doc, extracted.content, &self.options.postprocess_config());
        Ok(Some(build_article(extracted, metadata)))
    }

    fn load<S: HtmlSource + ?Sized>(&self, source: &S) -> Result<Document> {
        match source.markup() {
            Some(markup) if self.options.sanitize => parse_html(&sanitize_markup(markup)),
            _ => Ok(source.to_document()?.into_owned()),
        }
    }
}

fn build_article(extracted: ExtractedContent, metadata: Metadata) -> Article {
    let ExtractedContent { doc, content, byline, dir, lang, heading, .. } = extracted;

    let text_content = inner_text(&doc, content);
    let language = metadata.language.or(lang);
    let title = metadata
        .title
        .filter(|t| !t.trim().is_empty())
        .or(heading)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let excerpt = metadata
        .excerpt
        .filter(|e| !e.trim().is_empty())
        .or_else(|| excerpt_from_content(&doc, content))
        .unwrap_or_default();

    Article {
        title,
        byline: metadata.byline.or(byline).filter(|b| !b.is_empty()),
        content: doc.inner_html(content),
        length: text_content.chars().count(),
        text_content,
        excerpt,
        site_name: metadata.site_name,
        direction: resolve_direction(dir.as_deref(), language.as_deref()),
        language,
        published_time: metadata.published_time,
    }
}

/// First paragraph of the content that is long enough to summarize it.
fn excerpt_from_content(doc: &Document, content: NodeId) -> Option<String> {
    doc.elements_by_tag(content, &["p"])
        .into_iter()
        .map(|p| inner_text(doc, p))
        .find(|text| text.chars().count() >= EXCERPT_MIN_CHARS)
        .map(|text| truncate_excerpt(&text))
}

fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }

    let cut: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    let at_boundary = text.chars().nth(EXCERPT_MAX_CHARS).is_some_and(char::is_whitespace);
    let head = match cut.rfind(' ') {
        Some(index) if !at_boundary && index > 0 => &cut[..index],
        _ => cut.as_str(),
    };
    format!("{}...", head.trim_end())
}

/// Convenience function for one-liner extraction.
///
/// `options` defaults to [`ParseOptions::default`].
///
/// # Example
///
/// ```rust
/// use legible_core::parse;
///
/// let html = "<html><body><nav><a href='/'>Home</a></nav></body></html>";
/// assert!(parse(html, None, None).unwrap().is_none());
/// ```
pub fn parse<S: HtmlSource + ?Sized>(
    source: &S, base_uri: Option<&str>, options: Option<ParseOptions>,
) -> Result<Option<Article>> {
    Readability::with_options(options.unwrap_or_default()).parse(source, base_uri)
}
