//! Embedded page-state blob (`window.__INITIAL_STATE__ = {...}</script>`).
//!
//! The blob's layout has changed across site versions, so the note record is
//! found by trying an ordered list of path probes; the first that yields a
//! record with a title or description wins.

use crate::model::push_unique;
use crate::pipeline::{Harvest, Page};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static STATE_BLOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.+?\})\s*</script>").unwrap()
});

/// Bare `undefined` in value position (after `:`, `[` or `,`).
static UNDEFINED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([:\[,]\s*)undefined\b").unwrap());

/// Note fields shared by every known blob layout.
///
/// Read field by field from the raw JSON: a field with an unexpected shape is
/// skipped on its own and never costs the rest of the record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub title: Option<String>,
    pub desc: Option<String>,
    image_list: Vec<String>,
    images_list: Vec<String>,
}

/// Image entry keys, most preferred first.
const IMAGE_URL_KEYS: [&str; 3] = ["url", "urlDefault", "urlSizeLarge"];

fn string_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// First non-empty string among the entry's URL keys.
fn best_image_url(entry: &Value) -> Option<&str> {
    IMAGE_URL_KEYS
        .iter()
        .filter_map(|key| entry.get(*key)?.as_str())
        .find(|u| !u.is_empty())
}

fn image_list(v: &Value, key: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let Some(entries) = v.get(key).and_then(Value::as_array) else {
        return urls;
    };
    for url in entries.iter().filter_map(best_image_url) {
        push_unique(&mut urls, url);
    }
    urls
}

impl NoteRecord {
    pub fn from_value(v: &Value) -> Self {
        NoteRecord {
            title: string_field(v, "title"),
            desc: string_field(v, "desc"),
            image_list: image_list(v, "imageList"),
            images_list: image_list(v, "imagesList"),
        }
    }

    fn has_text(&self) -> bool {
        self.title.is_some() || self.desc.is_some()
    }

    /// Image URLs from `imageList`, or `imagesList` when the former yields none.
    pub fn image_urls(&self) -> Vec<String> {
        if self.image_list.is_empty() {
            self.images_list.clone()
        } else {
            self.image_list.clone()
        }
    }
}

type Probe = fn(&Value) -> Option<NoteRecord>;

/// Newest layout first.
const PROBES: &[(&str, Probe)] = &[
    ("noteData.data.noteData", probe_nested),
    ("noteData.normalNotePreloadData", probe_preload),
    ("note.noteDetailMap", probe_detail_map),
];

fn note_at(v: &Value) -> Option<NoteRecord> {
    v.is_object()
        .then(|| NoteRecord::from_value(v))
        .filter(NoteRecord::has_text)
}

fn probe_nested(data: &Value) -> Option<NoteRecord> {
    data.pointer("/noteData/data/noteData").and_then(note_at)
}

fn probe_preload(data: &Value) -> Option<NoteRecord> {
    data.pointer("/noteData/normalNotePreloadData").and_then(note_at)
}

fn probe_detail_map(data: &Value) -> Option<NoteRecord> {
    data.pointer("/note/noteDetailMap")?
        .as_object()?
        .values()
        .find_map(|entry| entry.get("note").and_then(note_at))
}

/// First probe that yields a note, with the path it matched.
pub fn find_note(data: &Value) -> Option<(&'static str, NoteRecord)> {
    PROBES
        .iter()
        .find_map(|(path, probe)| probe(data).map(|note| (*path, note)))
}

/// Raw JSON text of the state blob, if the page has one.
pub fn find_state_blob(html: &str) -> Option<&str> {
    STATE_BLOB_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Replace JavaScript `undefined` values with JSON `null`.
pub fn sanitize(raw: &str) -> String {
    UNDEFINED_RE.replace_all(raw, "${1}null").into_owned()
}

pub fn scan(page: &Page<'_>) -> Harvest {
    let mut harvest = Harvest::default();
    let Some(raw) = find_state_blob(page.html) else {
        return harvest;
    };
    let data: Value = match serde_json::from_str(&sanitize(raw)) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "state blob is not valid JSON");
            harvest.notes.push("INITIAL_STATE JSON parse failed".to_string());
            return harvest;
        }
    };
    match find_note(&data) {
        Some((path, note)) => {
            tracing::debug!(path, "note record found in state blob");
            harvest.images = note.image_urls();
            harvest.title = note.title;
            harvest.body = note.desc;
            harvest.note_record = true;
        }
        None => {
            let keys: Vec<&str> = data
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            harvest.notes.push(format!(
                "INITIAL_STATE present but no note data (keys: {:?})",
                keys
            ));
        }
    }
    harvest
}
