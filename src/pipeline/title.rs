//! Title heuristics: what counts as a real note title, and the `<title>` tag fallback.

use crate::pipeline::{parse_selector, preview, Harvest, Page};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

/// Page titles that name the site rather than the note.
const GENERIC_TITLES: &[&str] = &["小红书", "小红书 - 你的生活指南", "发现 - 小红书", ""];

/// Separator then brand name through end of string, e.g. " - 小红书" or "｜小红书 - 你的生活指南".
static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-–—|｜]\s*小红书.*$").unwrap());

/// Non-empty, not a generic site name, and longer than three characters.
pub fn is_useful_title(t: &str) -> bool {
    let t = t.trim();
    !GENERIC_TITLES.contains(&t) && t.chars().count() > 3
}

/// Strip the trailing site-name suffix from a page title so only the note title remains.
pub fn strip_title_site_suffix(s: &str) -> String {
    SITE_SUFFIX_RE.replace(s.trim(), "").into_owned()
}

/// `<title>` fallback. Yields a title only if it survives suffix stripping as a useful title.
pub fn scan(page: &Page<'_>) -> Harvest {
    let mut harvest = Harvest::default();
    let Some(title_sel) = parse_selector("title") else {
        return harvest;
    };
    let doc = Html::parse_document(page.html);
    let raw = match doc.select(&title_sel).next() {
        Some(el) => el.text().collect::<String>(),
        None => return harvest,
    };
    let candidate = strip_title_site_suffix(&raw);
    if is_useful_title(&candidate) {
        harvest
            .notes
            .push(format!("Title from <title> tag: 「{}」", preview(&candidate, 30)));
        harvest.title = Some(candidate);
    } else {
        harvest.notes.push(format!(
            "<title> tag unusable: 「{}」, skipped",
            raw.trim()
        ));
    }
    harvest
}
