//! Link locator: pull the post URL and a caption fragment out of pasted share text.

use once_cell::sync::Lazy;
use regex::Regex;

/// URL token: stops at whitespace, ASCII/CJK commas, enumeration comma, `!`, and closing brackets.
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s，,、!！\]】]+").unwrap());

static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://").unwrap());

static LEADING_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*").unwrap());

const URL_TRAILING_PUNCT: &[char] = &[
    '.', ',', ';', ':', '!', '?', '。', '，', '；', '：', '！', '？',
];

const TITLE_TRAILING_PUNCT: &[char] = &['.', ',', '。', '，', '…', '、', ' '];

/// Fragments shorter than this are list numbers, emoji, or other noise.
const MIN_SHARE_TITLE_CHARS: usize = 4;

/// Result of scanning share text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLink {
    /// First URL in the text, or the trimmed input when there is none.
    pub url: String,
    /// Caption text before the URL, or "" when absent or too short.
    pub share_title: String,
}

impl LocatedLink {
    /// False when no `http(s)://` URL was found and `url` is just the raw input.
    pub fn has_url(&self) -> bool {
        self.url.starts_with("http")
    }
}

/// Never fails; worst case both fields are empty.
pub fn locate(raw: &str) -> LocatedLink {
    LocatedLink {
        url: extract_url(raw),
        share_title: extract_share_title(raw),
    }
}

pub fn extract_url(raw: &str) -> String {
    match URL_RE.find(raw) {
        Some(m) => m.as_str().trim_end_matches(URL_TRAILING_PUNCT).to_string(),
        None => raw.trim().to_string(),
    }
}

pub fn extract_share_title(raw: &str) -> String {
    let Some(m) = SCHEME_RE.find(raw) else {
        return String::new();
    };
    let before = raw[..m.start()].trim();
    let before = LEADING_DIGITS_RE.replace(before, "");
    let before = before.trim_end_matches(TITLE_TRAILING_PUNCT);
    if before.chars().count() < MIN_SHARE_TITLE_CHARS {
        return String::new();
    }
    before.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_title_from_typical_share_text() {
        let link = locate("宝藏健身房推荐🔥 http://example.com/note/abc 复制后打开小红书查看");
        assert_eq!(link.url, "http://example.com/note/abc");
        assert_eq!(link.share_title, "宝藏健身房推荐🔥");
        assert!(link.has_url());
    }

    #[test]
    fn url_stops_at_cjk_punctuation_and_brackets() {
        assert_eq!(
            extract_url("【看这里 https://xhslink.com/a/AbC1】"),
            "https://xhslink.com/a/AbC1"
        );
        assert_eq!(
            extract_url("链接https://xhslink.com/a/AbC1，复制打开"),
            "https://xhslink.com/a/AbC1"
        );
        assert_eq!(
            extract_url("go https://xhslink.com/a/x、then"),
            "https://xhslink.com/a/x"
        );
    }

    #[test]
    fn url_trailing_punctuation_is_stripped() {
        assert_eq!(extract_url("see https://a.b/c."), "https://a.b/c");
        assert_eq!(extract_url("see https://a.b/c。"), "https://a.b/c");
        assert_eq!(extract_url("see https://a.b/c?;:"), "https://a.b/c");
        assert_eq!(extract_url("see https://a.b/c?x=1"), "https://a.b/c?x=1");
    }

    #[test]
    fn no_url_returns_trimmed_input() {
        let link = locate("  只是一段文字没有链接  ");
        assert_eq!(link.url, "只是一段文字没有链接");
        assert_eq!(link.share_title, "");
        assert!(!link.has_url());
    }

    #[test]
    fn first_url_wins() {
        assert_eq!(
            extract_url("a http://first.example/1 b https://second.example/2"),
            "http://first.example/1"
        );
    }

    #[test]
    fn share_title_strips_leading_list_number() {
        assert_eq!(
            extract_share_title("84 周末去哪儿玩攻略 http://xhslink.com/a/1"),
            "周末去哪儿玩攻略"
        );
    }

    #[test]
    fn share_title_strips_trailing_separators() {
        assert_eq!(
            extract_share_title("上海咖啡店合集，。… https://xhslink.com/a/1"),
            "上海咖啡店合集"
        );
    }

    #[test]
    fn share_title_too_short_is_noise() {
        assert_eq!(extract_share_title("12 好看 http://xhslink.com/a/1"), "");
        assert_eq!(extract_share_title("abc http://xhslink.com/a/1"), "");
        assert_eq!(extract_share_title("http://xhslink.com/a/1"), "");
    }

    #[test]
    fn share_title_counts_characters_not_bytes() {
        // Four CJK characters are 12 bytes but exactly the minimum length.
        assert_eq!(extract_share_title("健身打卡 http://x.y/z"), "健身打卡");
        assert_eq!(extract_share_title("健身打 http://x.y/z"), "");
    }
}
