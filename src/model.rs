//! Data model for one extraction: the request, its diagnostic log, the
//! recovered content ID, and the final content record handed to callers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static CONTENT_ID_IN_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:explore|discovery/item)/([a-f0-9]{24})").unwrap());

/// Raw pasted share text. Immutable for the duration of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    share_text: String,
}

impl ExtractionRequest {
    pub fn new(share_text: impl Into<String>) -> Self {
        Self {
            share_text: share_text.into(),
        }
    }

    pub fn share_text(&self) -> &str {
        &self.share_text
    }
}

/// Ordered, append-only list of human-readable diagnostics for one request.
///
/// Observability only: nothing in the pipeline branches on its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionLog(Vec<String>);

impl ExtractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any entry contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|e| e.contains(needle))
    }
}

/// 24-character lowercase hex note identifier taken from a post URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    /// Accepts exactly 24 lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == 24 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
            .then(|| Self(s.to_string()))
    }

    /// Find the ID in an `/explore/<id>` or `/discovery/item/<id>` path segment.
    pub fn find_in_url(url: &str) -> Option<Self> {
        CONTENT_ID_IN_PATH_RE
            .captures(url)
            .and_then(|c| c.get(1))
            .and_then(|m| Self::parse(m.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical note page under `site_root` (e.g. `https://www.xiaohongshu.com/`).
    pub fn canonical_url(&self, site_root: &str) -> String {
        format!("{}/explore/{}", site_root.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline output.
///
/// `image_urls` never holds duplicates and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: String,
    pub body: String,
    #[serde(rename = "imageUrls")]
    pub image_urls: Vec<String>,
    pub log: ExtractionLog,
}

/// How complete an extraction was. Lets the caller ask the user for exactly
/// the missing piece, or offer a manual-paste fallback on total failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Partial {
        missing_title: bool,
        missing_body: bool,
        missing_images: bool,
    },
    NothingRecovered,
}

impl ExtractedContent {
    pub fn outcome(&self) -> Outcome {
        let missing_title = self.title.is_empty();
        let missing_body = self.body.is_empty();
        let missing_images = self.image_urls.is_empty();
        if missing_title && missing_body {
            Outcome::NothingRecovered
        } else if missing_title || missing_body || missing_images {
            Outcome::Partial {
                missing_title,
                missing_body,
                missing_images,
            }
        } else {
            Outcome::Complete
        }
    }

    pub fn is_total_failure(&self) -> bool {
        self.outcome() == Outcome::NothingRecovered
    }
}

/// Append `url` unless it is empty or already present.
pub(crate) fn push_unique(list: &mut Vec<String>, url: &str) -> bool {
    if url.is_empty() || list.iter().any(|u| u == url) {
        return false;
    }
    list.push(url.to_string());
    true
}
