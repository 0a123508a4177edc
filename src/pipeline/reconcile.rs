//! Result reconciler: choose between the share-text caption and the scraped title.

use crate::model::ExtractionLog;
use crate::pipeline::title::is_useful_title;

/// A share-text caption this many times longer than the scraped title is taken
/// as the more complete title (page titles are often truncated).
const SHARE_TITLE_LENGTH_FACTOR: usize = 2;

/// True when the share-text caption should replace the scraped title.
pub fn prefer_share_title(share_title: &str, scraped_title: &str) -> bool {
    if share_title.is_empty() {
        return false;
    }
    !is_useful_title(scraped_title)
        || share_title.chars().count() > scraped_title.chars().count() * SHARE_TITLE_LENGTH_FACTOR
}

/// Final title for the result, logging when the caption wins.
pub fn reconcile_title(share_title: &str, scraped_title: &str, log: &mut ExtractionLog) -> String {
    if prefer_share_title(share_title, scraped_title) {
        log.push(format!(
            "Using share-text title (more complete than page title 「{}」)",
            scraped_title
        ));
        share_title.to_string()
    } else {
        scraped_title.to_string()
    }
}
