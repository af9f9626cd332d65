//! Article metadata: `<meta>` tags, JSON-LD and `<title>` heuristics.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::article::TextDirection;
use crate::dom_tree::{Document, NodeId};
use crate::scoring::normalize_whitespace;
use crate::selector::Selector;

static META_CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[content]").unwrap());

static CONTENT_LANGUAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[http-equiv="content-language" i][content]"#).unwrap());

static JSON_LD_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static SITE_LABELS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h1, h2, a[rel~="home"], [class*="logo"], [class*="brand"], [id*="logo"], [itemprop="publisher"]"#)
        .unwrap()
});

static PROPERTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*")
        .unwrap()
});

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(dc|dcterm|og|twitter|parsely|weibo:(article|webpage))\s*[-\.:]\s*)?(author|creator|pub-date|description|title|site_name)\s*$",
    )
    .unwrap()
});

static SCHEMA_DOT_ORG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://schema\.org/?$").unwrap());

static JSON_LD_ARTICLE_TYPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicQuestionArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference$",
    )
    .unwrap()
});

static CDATA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*<!\[CDATA\[|\]\]>\s*$").unwrap());

static TOKENIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

static TITLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" [\|\-\\/>»—–] ").unwrap());

static HIERARCHICAL_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" [\\/>»] ").unwrap());

static LEADING_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\|\-\\/>»—–]*[\|\-\\/>»—–]").unwrap());

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\|\-\\/>»—–]+").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&(quot|amp|apos|lt|gt);|&#(?:x([0-9a-f]+)|([0-9]+));").unwrap());

/// Primary language subtags written right to left.
const RTL_LANGUAGES: &[&str] = &["ar", "arc", "ckb", "dv", "fa", "ha", "he", "khw", "ks", "ku", "ps", "sd", "ur", "yi"];

const LTR_LANGUAGES: &[&str] = &[
    "af", "am", "az", "be", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et", "eu", "fi",
    "fil", "fo", "fr", "fy", "ga", "gd", "gl", "gu", "hi", "hr", "hu", "hy", "id", "is", "it", "ja", "jv", "ka", "kk",
    "km", "kn", "ko", "ky", "la", "lb", "lo", "lt", "lv", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "nb", "ne",
    "nl", "nn", "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv", "sw", "ta", "te", "tg", "th",
    "tl", "tr", "uk", "uz", "vi", "xh", "yo", "zh", "zu",
];

/// Metadata read from the document head before extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub language: Option<String>,
}

/// Article fields found in a schema.org JSON-LD block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdMetadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub date_published: Option<String>,
}

impl Document {
    /// Extract all metadata at once
    ///
    /// # Example
    ///
    /// ```rust
    /// use legible_core::Document;
    ///
    /// let html = r#"<html lang="fr"><head>
    ///     <title>Foo | Example Site</title>
    ///     <meta property="og:title" content="Foo">
    ///     <meta name="author" content="Ada">
    /// </head><body></body></html>"#;
    /// let metadata = Document::parse(html).unwrap().extract_metadata(false);
    /// assert_eq!(metadata.title.as_deref(), Some("Foo"));
    /// assert_eq!(metadata.byline.as_deref(), Some("Ada"));
    /// assert_eq!(metadata.language.as_deref(), Some("fr"));
    /// ```
    pub fn extract_metadata(&self, disable_json_ld: bool) -> Metadata {
        let values = self.meta_values();
        let get = |keys: &[&str]| keys.iter().find_map(|key| values.get(*key).cloned());

        let json_ld = if disable_json_ld { JsonLdMetadata::default() } else { self.extract_json_ld().unwrap_or_default() };

        let site_name = get(&["og:site_name"]).or(json_ld.site_name);

        let title = get(&["og:title"])
            .or(json_ld.title)
            .or_else(|| {
                get(&[
                    "dc:title",
                    "dcterm:title",
                    "twitter:title",
                    "weibo:article:title",
                    "weibo:webpage:title",
                    "title",
                    "parsely-title",
                ])
            })
            .or_else(|| Some(self.article_title(site_name.as_deref())).filter(|t| !t.is_empty()));

        let article_author = values.get("article:author").filter(|author| Url::parse(author).is_err()).cloned();
        let byline = get(&["author", "dc:creator", "dcterm:creator"])
            .or(article_author)
            .or_else(|| get(&["parsely-author"]))
            .or(json_ld.byline);

        let excerpt = get(&["description", "og:description"]).or(json_ld.excerpt).or_else(|| {
            get(&[
                "twitter:description",
                "dc:description",
                "dcterm:description",
                "weibo:article:description",
                "weibo:webpage:description",
            ])
        });

        let published_time = get(&["article:published_time"])
            .or(json_ld.date_published)
            .or_else(|| get(&["parsely-pub-date"]))
            .map(|value| normalize_published_time(&value));

        Metadata {
            title: title.map(|t| unescape_html_entities(&t)),
            byline: byline.map(|b| unescape_html_entities(&b)),
            excerpt: excerpt.map(|e| unescape_html_entities(&e)),
            site_name: site_name.map(|s| unescape_html_entities(&s)),
            published_time: published_time.map(|p| unescape_html_entities(&p)),
            language: self.extract_language(),
        }
    }

    /// `<meta>` contents keyed by normalized property or name, e.g.
    /// `og:title`, `dc:creator` or `parsely-pub-date`.
    pub fn meta_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        for meta in self.select_with(self.root(), &META_CONTENT) {
            let Some(content) = self.attr(meta, "content").map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };

            let mut matched = false;
            if let Some(property) = self.attr(meta, "property")
                && let Some(found) = PROPERTY_PATTERN.find(property)
            {
                let name: String = found.as_str().to_lowercase().split_whitespace().collect();
                values.insert(name, content.to_string());
                matched = true;
            }

            if !matched
                && let Some(name) = self.attr(meta, "name")
                && NAME_PATTERN.is_match(name)
            {
                let name: String = name.to_lowercase().split_whitespace().collect::<String>().replace('.', ":");
                values.insert(name, content.to_string());
            }
        }
        values
    }

    /// Language of the document: `<html lang>`, then the
    /// `content-language` http-equiv.
    pub fn extract_language(&self) -> Option<String> {
        let from_html = self
            .html_element()
            .and_then(|html| self.attr(html, "lang"))
            .map(str::trim)
            .filter(|lang| !lang.is_empty());
        if let Some(lang) = from_html {
            return Some(lang.to_string());
        }

        self.select_with(self.root(), &CONTENT_LANGUAGE)
            .into_iter()
            .find_map(|meta| self.attr(meta, "content").map(str::trim).filter(|c| !c.is_empty()))
            .map(str::to_string)
    }

    /// First schema.org article described by a JSON-LD script.
    pub fn extract_json_ld(&self) -> Option<JsonLdMetadata> {
        self.select_with(self.root(), &JSON_LD_SCRIPT)
            .into_iter()
            .find_map(|script| self.json_ld_from_script(script))
    }

    fn json_ld_from_script(&self, script: NodeId) -> Option<JsonLdMetadata> {
        let text = self.text_content(script);
        let content = CDATA.replace_all(&text, "");
        let parsed: Value = serde_json::from_str(&content).ok()?;

        let parsed = match parsed {
            Value::Array(items) => items.into_iter().find(is_article_type)?,
            other => other,
        };

        let context_matches = match parsed.get("@context") {
            Some(Value::String(context)) => SCHEMA_DOT_ORG.is_match(context),
            Some(Value::Object(context)) => context
                .get("@vocab")
                .and_then(Value::as_str)
                .is_some_and(|vocab| SCHEMA_DOT_ORG.is_match(vocab)),
            _ => false,
        };
        if !context_matches {
            return None;
        }

        let graph_item = match (parsed.get("@type"), parsed.get("@graph")) {
            (None, Some(Value::Array(graph))) => Some(graph.iter().find(|item| is_article_type(item)).cloned()?),
            _ => None,
        };
        let parsed = graph_item.unwrap_or(parsed);
        if !is_article_type(&parsed) {
            return None;
        }

        let string = |key: &str| parsed.get(key).and_then(Value::as_str).map(|s| s.trim().to_string());

        let title = match (string("name"), string("headline")) {
            (Some(name), Some(headline)) if name != headline => {
                let title = self.article_title(None);
                let name_matches = text_similarity(&name, &title) > 0.75;
                let headline_matches = text_similarity(&headline, &title) > 0.75;
                Some(if headline_matches && !name_matches { headline } else { name })
            }
            (Some(name), _) => Some(name),
            (None, headline) => headline,
        };

        let byline = match parsed.get("author") {
            Some(Value::String(name)) => Some(name.trim().to_string()),
            Some(Value::Array(authors)) => {
                let names: Vec<&str> = authors
                    .iter()
                    .filter_map(|author| author.get("name").and_then(Value::as_str).map(str::trim))
                    .collect();
                (!names.is_empty()).then(|| names.join(", "))
            }
            Some(author) => author.get("name").and_then(Value::as_str).map(|name| name.trim().to_string()),
            None => None,
        };

        let site_name = parsed
            .get("publisher")
            .and_then(|publisher| publisher.get("name"))
            .and_then(Value::as_str)
            .map(|name| name.trim().to_string());

        Some(JsonLdMetadata {
            title,
            byline,
            excerpt: string("description"),
            site_name,
            date_published: string("datePublished"),
        })
    }

    /// The `<title>` with site names and breadcrumb segments removed.
    ///
    /// A trailing or leading segment equal to `site_name` is dropped first,
    /// then one that repeats a heading or logo on the page. Otherwise the
    /// usual separator rules keep the most title-like part.
    pub fn article_title(&self, site_name: Option<&str>) -> String {
        let original = self.title().map(|t| normalize_whitespace(&t)).unwrap_or_default();
        if original.is_empty() {
            return original;
        }

        if let Some(site) = site_name.map(str::trim).filter(|s| !s.is_empty())
            && let Some(stripped) = strip_site_name(&original, site)
        {
            return stripped;
        }
        if let Some(stripped) = self.strip_repeated_segment(&original) {
            return stripped;
        }

        let mut title = original.clone();
        let mut had_hierarchical_separators = false;

        if TITLE_SEPARATOR.is_match(&title) {
            had_hierarchical_separators = HIERARCHICAL_SEPARATOR.is_match(&title);
            if let Some(last) = TITLE_SEPARATOR.find_iter(&original).last() {
                title = original[..last.start()].to_string();
            }
            if word_count(&title) < 3 {
                title = LEADING_SEGMENT.replace(&original, "").to_string();
            }
        } else if title.contains(": ") {
            let heading_matches = self
                .elements_by_tag(self.root(), &["h1", "h2"])
                .into_iter()
                .any(|heading| self.text_content(heading).trim() == title);
            if !heading_matches {
                let after_last = original.rfind(':').map(|i| &original[i + 1..]).unwrap_or(&original);
                title = after_last.to_string();
                if word_count(&title) < 3 {
                    let after_first = original.find(':').map(|i| &original[i + 1..]).unwrap_or(&original);
                    title = after_first.to_string();
                } else if original.find(':').is_some_and(|i| word_count(&original[..i]) > 5) {
                    title = original.clone();
                }
            }
        } else {
            let length = title.chars().count();
            if length > 150 || length < 15 {
                let h1s = self.elements_by_tag(self.root(), &["h1"]);
                if h1s.len() == 1 {
                    title = normalize_whitespace(&self.text_content(h1s[0]));
                }
            }
        }

        let title = normalize_whitespace(&title);
        let count = word_count(&title);
        if count <= 4
            && (!had_hierarchical_separators
                || count + 1 != word_count(&SEPARATOR_RUN.replace_all(&original, "")))
        {
            return original;
        }
        title
    }

    /// Drops the trailing (else leading) title segment when the page repeats
    /// it as a heading or site label. The dropped segment must be shorter
    /// than what remains.
    fn strip_repeated_segment(&self, title: &str) -> Option<String> {
        let separators: Vec<_> = TITLE_SEPARATOR.find_iter(title).collect();
        let (first, last) = (separators.first()?, separators.last()?);

        let labels: HashSet<String> = self
            .select_with(self.root(), &SITE_LABELS)
            .into_iter()
            .map(|label| normalize_whitespace(&self.text_content(label)).to_lowercase())
            .filter(|text| !text.is_empty())
            .collect();
        if labels.is_empty() {
            return None;
        }

        [title[last.end()..].trim(), title[..first.start()].trim()]
            .into_iter()
            .filter(|segment| labels.contains(&segment.to_lowercase()))
            .find_map(|segment| {
                strip_site_name(title, segment).filter(|rest| word_count(segment) < word_count(rest))
            })
    }
}

fn is_article_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => JSON_LD_ARTICLE_TYPES.is_match(kind),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| JSON_LD_ARTICLE_TYPES.is_match(kind)),
        _ => false,
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn strip_site_name(title: &str, site: &str) -> Option<String> {
    let separators: Vec<_> = TITLE_SEPARATOR.find_iter(title).collect();
    let (first, last) = (separators.first()?, separators.last()?);

    if title[last.end()..].trim().eq_ignore_ascii_case(site) {
        let head = title[..last.start()].trim();
        return (!head.is_empty()).then(|| head.to_string());
    }
    if title[..first.start()].trim().eq_ignore_ascii_case(site) {
        let tail = title[first.end()..].trim();
        return (!tail.is_empty()).then(|| tail.to_string());
    }
    None
}

/// Token overlap of `b` with `a` in `[0, 1]`: the share of `b`'s text made
/// of tokens that also occur in `a`.
///
/// ```rust
/// use legible_core::metadata::text_similarity;
///
/// assert_eq!(text_similarity("Rust in Action", "rust in action"), 1.0);
/// assert_eq!(text_similarity("", "anything"), 0.0);
/// assert!(text_similarity("Rust in Action", "Go in Practice") < 0.5);
/// ```
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let tokenize = |text: &str| -> Vec<String> {
        TOKENIZE
            .split(&text.to_lowercase())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    };
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let unique_b: Vec<&str> = tokens_b
        .iter()
        .filter(|token| !tokens_a.contains(token))
        .map(String::as_str)
        .collect();
    let distance = unique_b.join(" ").chars().count() as f64 / tokens_b.join(" ").chars().count() as f64;
    1.0 - distance
}

/// Decodes the five XML entities and numeric character references.
///
/// Invalid code points become U+FFFD.
pub fn unescape_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            if let Some(name) = caps.get(1) {
                return match name.as_str().to_ascii_lowercase().as_str() {
                    "quot" => "\"",
                    "amp" => "&",
                    "apos" => "'",
                    "lt" => "<",
                    _ => ">",
                }
                .to_string();
            }
            let code = match (caps.get(2), caps.get(3)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.filter(|c| *c != 0)
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string()
        })
        .into_owned()
}

/// Normalizes a publication date to RFC 3339 when it parses as RFC 3339 or
/// RFC 2822; otherwise returns the trimmed input.
///
/// ```rust
/// use legible_core::metadata::normalize_published_time;
///
/// assert_eq!(normalize_published_time(" 2024-01-15T10:30:00Z "), "2024-01-15T10:30:00Z");
/// assert_eq!(normalize_published_time("Mon, 15 Jan 2024 10:30:00 +0000"), "2024-01-15T10:30:00+00:00");
/// assert_eq!(normalize_published_time("last Tuesday"), "last Tuesday");
/// ```
pub fn normalize_published_time(value: &str) -> String {
    let value = value.trim();
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return value.to_string();
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(date) => date.to_rfc3339(),
        Err(_) => value.to_string(),
    }
}

/// Text direction from an explicit `dir` value, falling back to the
/// primary subtag of `language`. Subtags outside the known RTL and LTR
/// tables give `None`.
///
/// ```rust
/// use legible_core::TextDirection;
/// use legible_core::metadata::resolve_direction;
///
/// assert_eq!(resolve_direction(None, Some("ar-EG")), Some(TextDirection::Rtl));
/// assert_eq!(resolve_direction(None, Some("en")), Some(TextDirection::Ltr));
/// assert_eq!(resolve_direction(Some("rtl"), Some("en")), Some(TextDirection::Rtl));
/// assert_eq!(resolve_direction(None, None), None);
/// ```
pub fn resolve_direction(dir: Option<&str>, language: Option<&str>) -> Option<TextDirection> {
    match dir.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
        Some("rtl") => return Some(TextDirection::Rtl),
        Some("ltr") => return Some(TextDirection::Ltr),
        _ => {}
    }

    let primary = language?.trim().split(['-', '_']).next()?.to_ascii_lowercase();
    if RTL_LANGUAGES.contains(&primary.as_str()) {
        Some(TextDirection::Rtl)
    } else if LTR_LANGUAGES.contains(&primary.as_str()) {
        Some(TextDirection::Ltr)
    } else {
        None
    }
}
