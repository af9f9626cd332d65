//! Article output type and its wire format.
//!
//! An [`Article`] is produced once, at the end of a successful parse, and
//! serializes to a JSON object with exactly the keys `title`, `byline`,
//! `content`, `textContent`, `length`, `excerpt`, `siteName`, `language`,
//! `direction` and `publishedTime`. Missing values are emitted as `null`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The JSON wire format.
    #[default]
    Json,
    /// Serialized HTML of the extracted content.
    Html,
    /// Whitespace-normalized text of the extracted content.
    Text,
}

/// Writing direction of the article text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextDirection::Ltr => write!(f, "ltr"),
            TextDirection::Rtl => write!(f, "rtl"),
        }
    }
}

/// The readable view of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Article title; may be empty.
    pub title: String,

    /// Author line, if any was found.
    pub byline: Option<String>,

    /// Serialized HTML of the extracted subtree.
    pub content: String,

    /// Content with tags stripped and whitespace normalized.
    pub text_content: String,

    /// Character count of `text_content`.
    pub length: usize,

    /// Short summary; may be empty.
    pub excerpt: String,

    pub site_name: Option<String>,

    /// Language tag such as `en` or `pt-BR`.
    #[serde(alias = "lang")]
    pub language: Option<String>,

    #[serde(alias = "dir")]
    pub direction: Option<TextDirection>,

    /// Publication time, RFC 3339 when it could be parsed.
    pub published_time: Option<String>,
}

impl Article {
    /// Serializes the article to its compact JSON wire format.
    ///
    /// # Example
    ///
    /// ```rust
    /// use legible_core::{Article, TextDirection};
    ///
    /// let article = Article {
    ///     title: "Title".into(),
    ///     byline: None,
    ///     content: "<p>Hi</p>".into(),
    ///     text_content: "Hi".into(),
    ///     length: 2,
    ///     excerpt: String::new(),
    ///     site_name: None,
    ///     language: Some("en".into()),
    ///     direction: Some(TextDirection::Ltr),
    ///     published_time: None,
    /// };
    /// let json = article.to_json().unwrap();
    /// assert!(json.contains(r#""textContent":"Hi""#));
    /// assert!(json.contains(r#""byline":null"#));
    /// assert!(json.contains(r#""direction":"ltr""#));
    /// ```
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the article to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an article from its JSON wire format.
    ///
    /// Accepts `lang` and `dir` in place of `language` and `direction`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the article in the given format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.to_json_pretty(),
            OutputFormat::Html => Ok(self.content.clone()),
            OutputFormat::Text => Ok(self.text_content.clone()),
        }
    }
}
