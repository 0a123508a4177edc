//! Content extraction pipeline: share text in, title/body/image URLs out.
//!
//! Link locator -> up to N primary fetches, each running the extractor table
//! in order until the result is good enough -> secondary endpoint when nothing
//! was recovered but a content ID was seen -> title reconciliation.

mod client;
mod error;

pub mod link;
pub mod opengraph;
pub mod reconcile;
pub mod state;
pub mod title;

pub use client::{
    BrowserClient, BrowserClientBuilder, Fetch, FetchAttempt, Fingerprint, DEFAULT_FINGERPRINTS,
    DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS,
};
pub use error::FetchError;

use crate::model::{push_unique, ContentId, ExtractedContent, ExtractionLog, ExtractionRequest};
use scraper::Selector;
use std::time::Duration;
use title::is_useful_title;

pub const DEFAULT_SITE_ROOT: &str = "https://www.xiaohongshu.com/";
pub const DEFAULT_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
/// A body longer than this is enough to stop, even without a title.
const GOOD_ENOUGH_BODY_CHARS: usize = 10;

/// Parse a CSS selector, logging instead of panicking on a bad pattern.
pub(crate) fn parse_selector(sel: &str) -> Option<Selector> {
    match Selector::parse(sel) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::error!(selector = sel, error = %e, "invalid selector");
            None
        }
    }
}

/// First `max` characters of `s`, for log lines.
pub(crate) fn preview(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// One fetched document and the URL it was finally served from.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub html: &'a str,
    pub final_url: &'a str,
}

/// What one extractor recovered from one page.
#[derive(Debug, Default)]
pub struct Harvest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub images: Vec<String>,
    /// Came from a structured note record: overrides earlier fields and ends the search.
    pub note_record: bool,
    /// Log lines produced while extracting.
    pub notes: Vec<String>,
}

impl Harvest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.images.is_empty()
    }
}

/// Fields accumulated across extractors and attempts for one request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub images: Vec<String>,
}

impl Draft {
    /// Merge an extractor's result. Empty fields are filled; non-empty ones are
    /// replaced only by a note record or by a strict improvement.
    pub fn absorb(&mut self, harvest: &Harvest) {
        if let Some(title) = harvest.title.as_deref().filter(|t| !t.is_empty()) {
            let improves = self.title.is_empty()
                || (!is_useful_title(&self.title) && is_useful_title(title));
            if harvest.note_record || improves {
                self.title = title.to_string();
            }
        }
        if let Some(body) = harvest.body.as_deref().filter(|b| !b.is_empty()) {
            if harvest.note_record || body.chars().count() > self.body.chars().count() {
                self.body = body.to_string();
            }
        }
        for url in &harvest.images {
            push_unique(&mut self.images, url);
        }
    }

    /// Stop trying further strategies: a useful title with a body, a body over
    /// ten characters, or at least one image.
    pub fn is_good_enough(&self) -> bool {
        (is_useful_title(&self.title) && !self.body.is_empty())
            || self.body.chars().count() > GOOD_ENOUGH_BODY_CHARS
            || !self.images.is_empty()
    }

    fn summary(&self) -> String {
        format!(
            "title {} chars, body {} chars, {} images",
            self.title.chars().count(),
            self.body.chars().count(),
            self.images.len()
        )
    }
}

/// An extraction strategy over one fetched page.
pub struct Strategy {
    /// Name used in log lines.
    pub label: &'static str,
    /// Whether the strategy still has anything to contribute.
    pub wanted: fn(&Draft) -> bool,
    pub run: fn(&Page<'_>) -> Harvest,
}

fn always(_: &Draft) -> bool {
    true
}

fn title_not_useful(draft: &Draft) -> bool {
    !is_useful_title(&draft.title)
}

/// Primary-page strategies in priority order.
pub const STRATEGIES: &[Strategy] = &[
    Strategy {
        label: "og:tags",
        wanted: always,
        run: opengraph::scan,
    },
    Strategy {
        label: "INITIAL_STATE",
        wanted: always,
        run: state::scan,
    },
    Strategy {
        label: "<title> tag",
        wanted: title_not_useful,
        run: title::scan,
    },
];

/// Run `strategies` over one page, merging into `draft`. Returns true once the
/// result is good enough (or a note record was found) and the search can stop.
pub fn run_strategies(
    strategies: &[Strategy],
    page: &Page<'_>,
    draft: &mut Draft,
    log: &mut ExtractionLog,
) -> bool {
    for strategy in strategies {
        if !(strategy.wanted)(draft) {
            continue;
        }
        let harvest = (strategy.run)(page);
        for note in &harvest.notes {
            log.push(note.clone());
        }
        draft.absorb(&harvest);
        if harvest.note_record || (!harvest.is_empty() && draft.is_good_enough()) {
            log.push(format!("{} extracted ✓ ({})", strategy.label, draft.summary()));
            return true;
        }
        if !harvest.is_empty() {
            log.push(format!(
                "{} partial data ({}), trying next strategy",
                strategy.label,
                draft.summary()
            ));
        }
    }
    false
}

/// Progress milestones reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 1-based primary fetch attempt.
    PrimaryAttempt(u32),
    SecondaryEndpoint,
    Finished,
}

/// Knobs for one extraction. `Default` matches live-site settings.
pub struct ExtractOptions<'a> {
    pub progress: Option<&'a dyn Fn(Stage)>,
    /// Primary fetch attempts, each with a fresh fingerprint.
    pub attempts: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
    /// Root used for the secondary endpoint URL and as its `Referer`.
    pub site_root: String,
}

impl Default for ExtractOptions<'_> {
    fn default() -> Self {
        Self {
            progress: None,
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            site_root: DEFAULT_SITE_ROOT.to_string(),
        }
    }
}

impl ExtractOptions<'_> {
    fn report(&self, stage: Stage) {
        if let Some(progress) = self.progress {
            progress(stage);
        }
    }
}

/// Run the whole pipeline. Never fails: transport and parse problems end up in
/// the log, and total failure is an empty title and body (see
/// [ExtractedContent::outcome]).
pub fn extract<F: Fetch + ?Sized>(
    request: &ExtractionRequest,
    fetcher: &mut F,
    options: &ExtractOptions<'_>,
) -> ExtractedContent {
    let mut log = ExtractionLog::new();
    let located = link::locate(request.share_text());
    let has_url = located.has_url();
    let share_title = located.share_title;

    if !share_title.is_empty() {
        log.push(format!(
            "Title fragment from share text: 「{}」",
            preview(&share_title, 40)
        ));
    }
    if !has_url {
        log.push("No usable link found");
        options.report(Stage::Finished);
        return ExtractedContent {
            title: share_title,
            body: String::new(),
            image_urls: Vec::new(),
            log,
        };
    }
    let url = located.url;
    log.push(format!("Link: {}", url));

    let mut draft = Draft::default();
    let mut content_id: Option<ContentId> = None;
    for attempt in 1..=options.attempts.max(1) {
        options.report(Stage::PrimaryAttempt(attempt));
        if attempt > 1 {
            log.push(format!("Retry #{} with a fresh browser fingerprint", attempt));
            std::thread::sleep(options.retry_delay);
        }
        let fetched = match fetcher.get(&url, None) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(attempt, error = %e, "primary fetch failed");
                if e.is_timeout() {
                    log.push(format!("Attempt {}: request timed out", attempt));
                } else {
                    log.push(format!("Attempt {}: request failed ({})", attempt, e.category()));
                }
                continue;
            }
        };
        log.push(format!(
            "Attempt {}: HTTP {} at {}",
            attempt, fetched.status, fetched.final_url
        ));
        if content_id.is_none() {
            if let Some(id) = ContentId::find_in_url(&fetched.final_url) {
                log.push(format!("Content ID: {}", id));
                content_id = Some(id);
            }
        }
        if !fetched.is_ok() {
            continue;
        }
        let html = fetched.text();
        let page = Page {
            html: &html,
            final_url: &fetched.final_url,
        };
        if run_strategies(STRATEGIES, &page, &mut draft, &mut log) {
            break;
        }
    }

    if draft.title.is_empty() && draft.body.is_empty() {
        if let Some(id) = &content_id {
            options.report(Stage::SecondaryEndpoint);
            probe_secondary(id, fetcher, options, &mut draft, &mut log);
        }
    }

    let title = reconcile::reconcile_title(&share_title, &draft.title, &mut log);
    let content = ExtractedContent {
        title,
        body: draft.body,
        image_urls: draft.images,
        log,
    };
    finish(content, options)
}

fn finish(mut content: ExtractedContent, options: &ExtractOptions<'_>) -> ExtractedContent {
    if content.is_total_failure() {
        content.log.push("No strategy recovered any content");
        tracing::info!("extraction recovered nothing");
    } else {
        content.log.push(format!(
            "Final result: title {} chars, body {} chars, {} images",
            content.title.chars().count(),
            content.body.chars().count(),
            content.image_urls.len()
        ));
        tracing::info!(
            title_chars = content.title.chars().count(),
            body_chars = content.body.chars().count(),
            images = content.image_urls.len(),
            "extraction finished"
        );
    }
    options.report(Stage::Finished);
    content
}

/// Fetch the canonical note URL with the site root as referer and re-run the
/// Open-Graph scan only.
fn probe_secondary<F: Fetch + ?Sized>(
    id: &ContentId,
    fetcher: &mut F,
    options: &ExtractOptions<'_>,
    draft: &mut Draft,
    log: &mut ExtractionLog,
) {
    let url = id.canonical_url(&options.site_root);
    let fetched = match fetcher.get(&url, Some(&options.site_root)) {
        Ok(f) if f.is_ok() => f,
        Ok(f) => {
            log.push(format!("Secondary endpoint failed (HTTP {})", f.status));
            return;
        }
        Err(e) => {
            log.push(format!("Secondary endpoint failed ({})", e.category()));
            return;
        }
    };
    let html = fetched.text();
    let harvest = opengraph::scan(&Page {
        html: &html,
        final_url: &fetched.final_url,
    });
    draft.absorb(&harvest);
    if draft.title.is_empty() && draft.body.is_empty() {
        log.push("Secondary endpoint returned no content");
    } else {
        log.push(format!("Secondary endpoint extracted ✓ ({})", draft.summary()));
    }
}
