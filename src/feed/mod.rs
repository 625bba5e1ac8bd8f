//! Feed retrieval and parsing.
//!
//! [`FeedSource`] fetches raw documents and [`parse_feed`] turns RSS 2.0,
//! RSS 1.0 (RDF), and Atom documents into a flat list of [`FeedEntry`].

mod fetcher;
mod parser;

pub use fetcher::{FeedSource, FetchError, FetchResult, HttpFeedSource};
pub use parser::{parse_feed, strip_html};

use thiserror::Error;

/// A single item or entry as found in the feed.
///
/// Fields are optional because real feeds omit them freely; defaults are
/// applied when the entry becomes an
/// [`Opportunity`](crate::opportunity::Opportunity).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Plain text summary, HTML already stripped
    pub summary: Option<String>,
    /// Publication date exactly as written in the feed
    pub published: Option<String>,
}

/// A parsed feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Errors raised while parsing a feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed document: {0}")]
    Malformed(String),

    #[error("document is not an RSS or Atom feed")]
    NotAFeed,
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        FeedError::Malformed(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FeedError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        FeedError::Malformed(e.to_string())
    }
}
