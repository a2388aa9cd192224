//! Track query classification
//!
//! Anything that parses as an absolute URL is handed to the node untouched;
//! everything else becomes a YouTube search.

use url::Url;

const SEARCH_PREFIX: &str = "ytsearch:";

/// What the submitter typed, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    Url(String),
    Search(String),
}

impl TrackQuery {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) if url.has_host() || url.scheme() == "file" => TrackQuery::Url(input.to_string()),
            _ => TrackQuery::Search(input.to_string()),
        }
    }

    /// Identifier string the audio node understands
    pub fn identifier(&self) -> String {
        match self {
            TrackQuery::Url(url) => url.clone(),
            TrackQuery::Search(text) => format!("{}{}", SEARCH_PREFIX, text),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TrackQuery::Url(s) | TrackQuery::Search(s) => s,
        }
    }
}

impl std::fmt::Display for TrackQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
