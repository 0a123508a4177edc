//! Transport failures for a single fetch. All of these are recoverable: the
//! pipeline logs the category and moves on to the next attempt or strategy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("Redirect error at {url}: {source}")]
    Redirect { url: String, source: reqwest::Error },

    #[error("Failed to read response body from {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Failed to create HTTP client: {source}")]
    Client { source: reqwest::Error },

    #[error("Invalid value for header {name}: {value:?}")]
    InvalidHeader { name: &'static str, value: String },
}

impl FetchError {
    /// Classify a reqwest error raised while sending or reading `url`.
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if e.is_connect() {
            FetchError::Connect { url, source: e }
        } else if e.is_redirect() {
            FetchError::Redirect { url, source: e }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body { url, source: e }
        } else if e.is_builder() {
            FetchError::Client { source: e }
        } else {
            FetchError::Request { url, source: e }
        }
    }

    /// Short stable name written to the extraction log.
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "Timeout",
            FetchError::Connect { .. } => "ConnectError",
            FetchError::Redirect { .. } => "TooManyRedirects",
            FetchError::Body { .. } => "BodyReadError",
            FetchError::Request { .. } => "RequestError",
            FetchError::Client { .. } => "ClientBuildError",
            FetchError::InvalidHeader { .. } => "InvalidHeader",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_category_and_message() {
        let e = FetchError::Timeout {
            url: "http://example.com/note/abc".into(),
        };
        assert!(e.is_timeout());
        assert_eq!(e.category(), "Timeout");
        assert_eq!(e.to_string(), "Timed out fetching http://example.com/note/abc");
    }

    #[test]
    fn builder_error_is_classified_as_client() {
        // A URL without a scheme fails in the request builder, before any I/O.
        let client = reqwest::blocking::Client::new();
        let err = match client.get("not a url").send() {
            Err(e) => e,
            Ok(_) => return,
        };
        let e = FetchError::from_reqwest("not a url", err);
        assert_eq!(e.category(), "ClientBuildError");
        assert!(!e.is_timeout());
    }
}
