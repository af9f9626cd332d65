//! Error types for Legible operations.
//!
//! This module defines the main error type [`LegibleError`]. A document whose
//! content is rejected by the extractor is *not* an error: [`crate::parse`]
//! returns `Ok(None)` in that case.
//!
//! # Example
//!
//! ```rust
//! use legible_core::{LegibleError, Result};
//!
//! fn guard(count: usize, max: usize) -> Result<()> {
//!     if max > 0 && count > max {
//!         return Err(LegibleError::DocumentTooLarge { count, max });
//!     }
//!     Ok(())
//! }
//!
//! assert!(guard(50, 5).is_err());
//! ```

use thiserror::Error;

/// Main error type for article extraction.
///
/// # Example
///
/// ```rust
/// use legible_core::{LegibleError, ParseOptions, parse};
///
/// let html = "<html><body><div><p>a</p><p>b</p><p>c</p></div></body></html>";
/// let options = ParseOptions::builder().max_elems_to_parse(3).build();
///
/// match parse(html, None, Some(options)) {
///     Err(LegibleError::DocumentTooLarge { count, max }) => assert!(count > max),
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum LegibleError {
    /// No parseable root could be constructed from the source.
    ///
    /// Malformed tags are recovered by the HTML parser and never produce
    /// this error.
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),

    /// The element count exceeded `max_elems_to_parse`.
    #[error("Document too large: {count} elements exceeds the limit of {max}")]
    DocumentTooLarge { count: usize, max: usize },

    /// Invalid base URI.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Unsupported or malformed CSS selector passed to the DOM query API.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Article serialization errors.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for LegibleError.
pub type Result<T> = std::result::Result<T, LegibleError>;
