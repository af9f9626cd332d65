pub mod article;
pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod readerable;
pub mod sanitize;
pub mod scoring;
pub mod selector;
mod serialize;

pub use article::{Article, OutputFormat, TextDirection};
pub use dom_tree::{Document, NodeData, NodeId};
pub use error::{LegibleError, Result};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, grab_article};
pub use metadata::Metadata;
pub use parse::HtmlSource;
#[doc(hidden)]
pub use postprocess::{PostProcessConfig, postprocess_article};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_document};
pub use readability::{ParseOptions, ParseOptionsBuilder, Readability, parse};
pub use readerable::{
    ReaderAvailability, ReaderableOptions, check_availability, is_probably_readerable,
    is_probably_readerable_with_options,
};
pub use sanitize::sanitize_markup;
pub use selector::Selector;
