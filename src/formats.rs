//! Output rendering for an extraction: human-readable text or JSON.

use crate::images::MaterializedImage;
use crate::model::{ExtractedContent, Outcome};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Errors from rendering or writing output.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

/// Everything one run prints: the content, optional materialized images, and whether to show the log.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub content: &'a ExtractedContent,
    /// `None` when images were not materialized.
    pub images: Option<&'a [MaterializedImage]>,
    pub include_log: bool,
}

/// Names of the missing pieces, for display.
fn missing_parts(outcome: Outcome) -> Vec<&'static str> {
    match outcome {
        Outcome::Complete => Vec::new(),
        Outcome::NothingRecovered => vec!["title", "body"],
        Outcome::Partial {
            missing_title,
            missing_body,
            missing_images,
        } => [
            (missing_title, "title"),
            (missing_body, "body"),
            (missing_images, "images"),
        ]
        .into_iter()
        .filter_map(|(missing, name)| missing.then_some(name))
        .collect(),
    }
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Complete => "complete",
        Outcome::Partial { .. } => "partial",
        Outcome::NothingRecovered => "nothing_recovered",
    }
}

fn decoded<'a>(images: &'a [MaterializedImage], url: &str) -> Option<&'a MaterializedImage> {
    images.iter().find(|i| i.url == url)
}

pub fn render_text(report: &Report<'_>) -> String {
    let content = report.content;
    let outcome = content.outcome();
    let mut out = String::new();

    let status = match outcome {
        Outcome::Complete => "complete".to_string(),
        Outcome::Partial { .. } => format!("partial (missing: {})", missing_parts(outcome).join(", ")),
        Outcome::NothingRecovered => {
            "nothing recovered; paste the title and body manually".to_string()
        }
    };
    out.push_str(&format!("Status: {}\n", status));
    out.push_str(&format!("Title: {}\n", content.title));
    if !content.body.is_empty() {
        out.push('\n');
        out.push_str(content.body.trim_end());
        out.push('\n');
    }
    if !content.image_urls.is_empty() {
        out.push_str(&format!("\nImages ({}):\n", content.image_urls.len()));
        for (i, url) in content.image_urls.iter().enumerate() {
            let suffix = match report.images {
                None => String::new(),
                Some(images) => match decoded(images, url) {
                    Some(img) => format!(" [{}x{}]", img.image.width(), img.image.height()),
                    None => " [dropped]".to_string(),
                },
            };
            out.push_str(&format!("  {}. {}{}\n", i + 1, url, suffix));
        }
    }
    if report.include_log {
        out.push_str("\nLog:\n");
        for entry in content.log.entries() {
            out.push_str(&format!("  - {}\n", entry));
        }
    }
    out
}

#[derive(Serialize)]
struct JsonImage<'a> {
    url: &'a str,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    content: &'a ExtractedContent,
    outcome: &'static str,
    missing: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<JsonImage<'a>>>,
}

/// JSON object with the content fields plus `outcome`, `missing`, and (when materialized) `images`.
/// The log is always included.
pub fn render_json(report: &Report<'_>) -> Result<String, FormatError> {
    let outcome = report.content.outcome();
    let images = report.images.map(|images| {
        images
            .iter()
            .map(|i| JsonImage {
                url: &i.url,
                width: i.image.width(),
                height: i.image.height(),
            })
            .collect()
    });
    let json = JsonReport {
        content: report.content,
        outcome: outcome_name(outcome),
        missing: missing_parts(outcome),
        images,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

pub fn render(report: &Report<'_>, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Write rendered output to `path`, or stdout when `None`.
pub fn write_output(rendered: &str, path: Option<&Path>) -> Result<(), FormatError> {
    match path {
        Some(path) => {
            let mut f = File::create(path).map_err(|e| FormatError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            f.write_all(rendered.as_bytes()).map_err(|e| FormatError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractionLog;
    use image::RgbImage;
    use std::error::Error;

    fn sample() -> ExtractedContent {
        let mut log = ExtractionLog::new();
        log.push("og:tags extracted ✓");
        ExtractedContent {
            title: "好身材从这开始".to_string(),
            body: "每周三练".to_string(),
            image_urls: vec![
                "https://img/1.jpg".to_string(),
                "https://img/2.jpg".to_string(),
            ],
            log,
        }
    }

    #[test]
    fn text_complete_without_log() {
        let c = sample();
        let s = render_text(&Report {
            content: &c,
            images: None,
            include_log: false,
        });
        assert!(s.starts_with("Status: complete\n"));
        assert!(s.contains("Title: 好身材从这开始\n"));
        assert!(s.contains("\n每周三练\n"));
        assert!(s.contains("  2. https://img/2.jpg\n"));
        assert!(!s.contains("Log:"));
    }

    #[test]
    fn text_marks_dropped_images_and_shows_log() {
        let c = sample();
        let images = vec![MaterializedImage {
            url: "https://img/2.jpg".to_string(),
            image: RgbImage::new(4, 3),
        }];
        let s = render_text(&Report {
            content: &c,
            images: Some(&images),
            include_log: true,
        });
        assert!(s.contains("  1. https://img/1.jpg [dropped]\n"));
        assert!(s.contains("  2. https://img/2.jpg [4x3]\n"));
        assert!(s.contains("Log:\n  - og:tags extracted ✓\n"));
    }

    #[test]
    fn text_partial_lists_missing_parts() {
        let mut c = sample();
        c.body.clear();
        c.image_urls.clear();
        let s = render_text(&Report {
            content: &c,
            images: None,
            include_log: false,
        });
        assert!(s.starts_with("Status: partial (missing: body, images)\n"));
    }

    #[test]
    fn text_nothing_recovered_suggests_manual_paste() {
        let c = ExtractedContent::default();
        let s = render_text(&Report {
            content: &c,
            images: None,
            include_log: false,
        });
        assert!(s.contains("paste the title and body manually"));
    }

    #[test]
    fn json_has_content_outcome_and_log() -> Result<(), Box<dyn Error>> {
        let c = sample();
        let s = render_json(&Report {
            content: &c,
            images: None,
            include_log: false,
        })?;
        let v: serde_json::Value = serde_json::from_str(&s)?;
        assert_eq!(v["title"], "好身材从这开始");
        assert_eq!(v["imageUrls"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(v["outcome"], "complete");
        assert_eq!(v["missing"].as_array().map(|a| a.len()), Some(0));
        assert_eq!(v["log"][0], "og:tags extracted ✓");
        assert!(v.get("images").is_none());
        Ok(())
    }

    #[test]
    fn json_includes_materialized_images() -> Result<(), Box<dyn Error>> {
        let c = sample();
        let images = vec![MaterializedImage {
            url: "https://img/1.jpg".to_string(),
            image: RgbImage::new(2, 5),
        }];
        let s = render_json(&Report {
            content: &c,
            images: Some(&images),
            include_log: true,
        })?;
        let v: serde_json::Value = serde_json::from_str(&s)?;
        assert_eq!(v["images"][0]["url"], "https://img/1.jpg");
        assert_eq!(v["images"][0]["width"], 2);
        assert_eq!(v["images"][0]["height"], 5);
        Ok(())
    }

    #[test]
    fn json_nothing_recovered() -> Result<(), Box<dyn Error>> {
        let c = ExtractedContent::default();
        let v: serde_json::Value = serde_json::from_str(&render_json(&Report {
            content: &c,
            images: None,
            include_log: false,
        })?)?;
        assert_eq!(v["outcome"], "nothing_recovered");
        assert_eq!(v["missing"][0], "title");
        assert_eq!(v["missing"][1], "body");
        Ok(())
    }

    #[test]
    fn write_output_to_file() -> Result<(), Box<dyn Error>> {
        let path = std::env::temp_dir().join("notescrape_formats_test_output.txt");
        write_output("hello\n", Some(&path))?;
        assert_eq!(std::fs::read_to_string(&path)?, "hello\n");
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn write_output_missing_dir_errors() {
        let path = Path::new("/nonexistent_dir_notescrape_xyz/out.txt");
        assert!(matches!(
            write_output("x", Some(path)),
            Err(FormatError::Io { .. })
        ));
    }
}
