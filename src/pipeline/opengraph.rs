//! Open-Graph scan: `og:title`, the longest description-like meta, and every `og:image`.
//!
//! Matching is on parsed `<meta>` elements, so attribute order in the markup
//! (`property` before `content` or after it) does not matter.

use crate::model::push_unique;
use crate::pipeline::{parse_selector, Harvest, Page};
use scraper::Html;

const TITLE_KEYS: &[&str] = &["og:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "description"];
const IMAGE_KEYS: &[&str] = &["og:image"];

pub fn scan(page: &Page<'_>) -> Harvest {
    let mut harvest = Harvest::default();
    let Some(meta_sel) = parse_selector("meta[content]") else {
        return harvest;
    };
    let doc = Html::parse_document(page.html);

    let mut title: Option<String> = None;
    let mut body = String::new();
    for el in doc.select(&meta_sel) {
        let attrs = el.value();
        let Some(key) = attrs.attr("property").or_else(|| attrs.attr("name")) else {
            continue;
        };
        let key = key.trim();
        let content = attrs.attr("content").unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        if title.is_none() && TITLE_KEYS.contains(&key) {
            title = Some(content.to_string());
        } else if DESCRIPTION_KEYS.contains(&key) {
            if content.chars().count() > body.chars().count() {
                body = content.to_string();
            }
        } else if IMAGE_KEYS.contains(&key) {
            push_unique(&mut harvest.images, content);
        }
    }

    harvest.title = title;
    harvest.body = (!body.is_empty()).then_some(body);
    harvest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_html(html: &str) -> Harvest {
        scan(&Page {
            html,
            final_url: "http://example.com/note/abc",
        })
    }

    const NORMAL_ORDER: &str = r#"<html><head>
<meta property="og:title" content="好身材从这开始">
<meta property="og:description" content="每周三练，坚持三个月">
<meta property="og:image" content="https://img.example.com/1.jpg">
<meta property="og:image" content="https://img.example.com/2.jpg">
</head><body></body></html>"#;

    const REVERSED_ORDER: &str = r#"<html><head>
<meta content="好身材从这开始" property="og:title">
<meta content="每周三练，坚持三个月" property="og:description">
<meta content="https://img.example.com/1.jpg" property="og:image">
<meta content="https://img.example.com/2.jpg" property="og:image">
</head><body></body></html>"#;

    #[test]
    fn normal_attribute_order() {
        let h = scan_html(NORMAL_ORDER);
        assert_eq!(h.title.as_deref(), Some("好身材从这开始"));
        assert_eq!(h.body.as_deref(), Some("每周三练，坚持三个月"));
        assert_eq!(
            h.images,
            vec![
                "https://img.example.com/1.jpg".to_string(),
                "https://img.example.com/2.jpg".to_string()
            ]
        );
    }

    #[test]
    fn reversed_attribute_order_matches_normal() {
        let normal = scan_html(NORMAL_ORDER);
        let reversed = scan_html(REVERSED_ORDER);
        assert_eq!(normal.title, reversed.title);
        assert_eq!(normal.body, reversed.body);
        assert_eq!(normal.images, reversed.images);
    }

    #[test]
    fn longest_description_wins() {
        let h = scan_html(
            r#"<head>
<meta property="og:description" content="短的">
<meta name="description" content="这是一个更长的描述文字，包含更多的细节">
</head>"#,
        );
        assert_eq!(h.body.as_deref(), Some("这是一个更长的描述文字，包含更多的细节"));
    }

    #[test]
    fn duplicate_and_empty_images_are_skipped() {
        let h = scan_html(
            r#"<head>
<meta property="og:image" content="https://img.example.com/1.jpg">
<meta content="https://img.example.com/1.jpg" property="og:image">
<meta property="og:image" content="">
<meta property="og:image" content="https://img.example.com/3.jpg">
</head>"#,
        );
        assert_eq!(h.images.len(), 2);
        assert_eq!(h.images[1], "https://img.example.com/3.jpg");
    }

    #[test]
    fn html_entities_are_decoded() {
        let h = scan_html(r#"<meta property="og:title" content="Tom &amp; Jerry 的日常">"#);
        assert_eq!(h.title.as_deref(), Some("Tom & Jerry 的日常"));
    }

    #[test]
    fn page_without_og_tags_yields_empty_harvest() {
        let h = scan_html("<html><head><title>小红书</title></head></html>");
        assert!(h.is_empty());
    }
}
