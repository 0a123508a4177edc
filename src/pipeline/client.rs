//! Blocking HTTP fetches that present a randomized mobile-browser fingerprint.
//!
//! Every call to [Fetch::get] on a [BrowserClient] builds a fresh session (no
//! cookies carried over) with a fingerprint different from the one used by the
//! previous call.

use crate::pipeline::error::FetchError;
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Built-in fingerprint pool: (label, User-Agent). Read-only for the life of the process.
pub const DEFAULT_FINGERPRINTS: [(&str, &str); 4] = [
    (
        "iphone-safari",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    ),
    (
        "android-chrome",
        "Mozilla/5.0 (Linux; Android 14; Pixel 8 Pro) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/121.0.6167.178 Mobile Safari/537.36",
    ),
    // In-app browsers get friendlier treatment from the source site.
    (
        "wechat-inapp",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3_1 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.47(0x18002f30) \
         NetType/WIFI Language/zh_CN",
    ),
    (
        "ipad-safari",
        "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    ),
];

/// One browser identity: a label for logs and the User-Agent it sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub label: String,
    pub user_agent: String,
}

impl Fingerprint {
    pub fn defaults() -> Vec<Fingerprint> {
        DEFAULT_FINGERPRINTS
            .iter()
            .map(|(label, ua)| Fingerprint {
                label: label.to_string(),
                user_agent: ua.to_string(),
            })
            .collect()
    }
}

/// One HTTP round trip. Not persisted beyond the attempt that produced it.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Label of the fingerprint presented.
    pub fingerprint: String,
    /// URL requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchAttempt {
    /// Only a plain 200 counts; anti-bot pages often come back as 2xx variants or 3xx/4xx.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A source of page fetches. Implemented by [BrowserClient] for live traffic
/// and by in-memory fakes in tests.
pub trait Fetch {
    /// GET `url`, following redirects. A non-200 status is not an error here.
    fn get(&mut self, url: &str, referer: Option<&str>) -> Result<FetchAttempt, FetchError>;
}

/// Choose an index into a pool of `len` fingerprints, never repeating `previous`
/// when the pool has an alternative.
pub(crate) fn pick_fingerprint<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    previous: Option<usize>,
) -> usize {
    match previous {
        Some(prev) if len > 1 && prev < len => {
            let i = rng.random_range(0..len - 1);
            if i >= prev {
                i + 1
            } else {
                i
            }
        }
        _ => rng.random_range(0..len.max(1)),
    }
}

/// Fetch client factory: holds the fingerprint pool and shared header settings,
/// and makes a new session per request.
#[derive(Debug)]
pub struct BrowserClient {
    pool: Vec<Fingerprint>,
    headers: HeaderMap,
    timeout: Duration,
    max_redirects: usize,
    last_fingerprint: Option<usize>,
}

impl BrowserClient {
    /// Client with the built-in pool, 15s timeout and default headers.
    pub fn new() -> Result<Self, FetchError> {
        Self::builder().build()
    }

    pub fn builder() -> BrowserClientBuilder {
        BrowserClientBuilder::default()
    }

    pub fn pool(&self) -> &[Fingerprint] {
        &self.pool
    }

    fn session(&self, fingerprint: &Fingerprint) -> Result<reqwest::blocking::Client, FetchError> {
        reqwest::blocking::Client::builder()
            .user_agent(fingerprint.user_agent.as_str())
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .build()
            .map_err(|e| FetchError::Client { source: e })
    }
}

impl Fetch for BrowserClient {
    fn get(&mut self, url: &str, referer: Option<&str>) -> Result<FetchAttempt, FetchError> {
        let index = pick_fingerprint(&mut rand::rng(), self.pool.len(), self.last_fingerprint);
        self.last_fingerprint = Some(index);
        let fingerprint = &self.pool[index];
        let session = self.session(fingerprint)?;

        let mut request = session.get(url);
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }
        tracing::debug!(url, fingerprint = %fingerprint.label, "fetching");
        let response = request
            .send()
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| FetchError::from_reqwest(url, e))?
            .to_vec();
        tracing::debug!(url, %final_url, status, bytes = body.len(), "fetched");
        Ok(FetchAttempt {
            fingerprint: fingerprint.label.clone(),
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

/// Builder for [BrowserClient] with optional pool override, timeout, redirects, and language.
#[derive(Debug)]
pub struct BrowserClientBuilder {
    user_agents: Vec<String>,
    timeout_secs: u64,
    max_redirects: usize,
    accept_language: Option<String>,
}

impl Default for BrowserClientBuilder {
    fn default() -> Self {
        Self {
            user_agents: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_language: None,
        }
    }
}

impl BrowserClientBuilder {
    /// Replace the built-in pool. An empty list keeps the built-in pool.
    pub fn user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.user_agents = user_agents;
        self
    }

    /// Per-request timeout in seconds. Default 15.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_redirects(mut self, n: usize) -> Self {
        self.max_redirects = n;
        self
    }

    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    pub fn build(self) -> Result<BrowserClient, FetchError> {
        let pool: Vec<Fingerprint> = if self.user_agents.is_empty() {
            Fingerprint::defaults()
        } else {
            self.user_agents
                .into_iter()
                .enumerate()
                .map(|(i, ua)| Fingerprint {
                    label: format!("custom-{}", i + 1),
                    user_agent: ua,
                })
                .collect()
        };
        for fp in &pool {
            HeaderValue::from_str(&fp.user_agent).map_err(|_| FetchError::InvalidHeader {
                name: "User-Agent",
                value: fp.user_agent.clone(),
            })?;
        }
        let language = self
            .accept_language
            .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string());
        let headers = browser_headers(&language)?;
        Ok(BrowserClient {
            pool,
            headers,
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
            last_fingerprint: None,
        })
    }
}

/// Headers a mobile browser sends on a top-level navigation.
fn browser_headers(accept_language: &str) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_str(accept_language).map_err(|_| FetchError::InvalidHeader {
            name: "Accept-Language",
            value: accept_language.to_string(),
        })?,
    );
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_pool_has_in_app_browser() {
        let pool = Fingerprint::defaults();
        assert!(pool.len() >= 3);
        assert!(pool.iter().any(|f| f.user_agent.contains("MicroMessenger")));
        assert!(pool.iter().all(|f| f.user_agent.contains("Mobile")));
    }

    #[test]
    fn pick_never_repeats_previous() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut prev = None;
        for _ in 0..500 {
            let i = pick_fingerprint(&mut rng, 4, prev);
            assert!(i < 4);
            assert_ne!(Some(i), prev);
            prev = Some(i);
        }
    }

    #[test]
    fn pick_covers_whole_pool() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 4];
        let mut prev = None;
        for _ in 0..200 {
            let i = pick_fingerprint(&mut rng, 4, prev);
            seen[i] = true;
            prev = Some(i);
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn pick_single_entry_pool_reuses_it() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_fingerprint(&mut rng, 1, Some(0)), 0);
        assert_eq!(pick_fingerprint(&mut rng, 1, None), 0);
    }

    #[test]
    fn browser_headers_mimic_mobile_navigation() -> Result<(), FetchError> {
        let h = browser_headers(DEFAULT_ACCEPT_LANGUAGE)?;
        assert_eq!(h.get(header::ACCEPT).map(|v| v.as_bytes()), Some(ACCEPT_HTML.as_bytes()));
        assert_eq!(
            h.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()),
            Some("zh-CN,zh;q=0.9,en;q=0.8")
        );
        assert_eq!(
            h.get(header::ACCEPT_ENCODING).and_then(|v| v.to_str().ok()),
            Some("gzip, deflate, br")
        );
        assert_eq!(
            h.get(header::CONNECTION).and_then(|v| v.to_str().ok()),
            Some("keep-alive")
        );
        assert!(h.contains_key("sec-fetch-mode"));
        Ok(())
    }

    #[test]
    fn builder_custom_user_agents_replace_pool() -> Result<(), FetchError> {
        let client = BrowserClient::builder()
            .user_agents(vec!["UA-One".into(), "UA-Two".into()])
            .build()?;
        assert_eq!(client.pool().len(), 2);
        assert_eq!(client.pool()[0].label, "custom-1");
        assert_eq!(client.pool()[1].user_agent, "UA-Two");
        Ok(())
    }

    #[test]
    fn builder_rejects_invalid_accept_language() {
        let result = BrowserClient::builder().accept_language("zh\nCN").build();
        match result {
            Err(FetchError::InvalidHeader { name, .. }) => assert_eq!(name, "Accept-Language"),
            other => panic!("expected InvalidHeader, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn fetch_attempt_only_200_is_ok() {
        let mut a = FetchAttempt {
            fingerprint: "iphone-safari".into(),
            url: "http://example.com".into(),
            final_url: "http://example.com".into(),
            status: 200,
            body: "<html>小红书</html>".as_bytes().to_vec(),
        };
        assert!(a.is_ok());
        assert_eq!(a.text(), "<html>小红书</html>");
        a.status = 204;
        assert!(!a.is_ok());
    }
}
