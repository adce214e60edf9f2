use crate::db::{SubmissionRow, UserRow};
use serde::Deserialize;
use tracing::debug;

/// Crop anchor inside a source image, both coordinates as percentages of the
/// image dimensions. The store keeps this as a free-form JSON column, so the
/// parser validates the shape and range instead of trusting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
}

impl FocalPoint {
    pub fn from_json(raw: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Raw {
            x: f64,
            y: f64,
        }
        let parsed: Raw = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(error = ?err, "ignoring malformed focal point");
                return None;
            }
        };
        if !(0.0..=100.0).contains(&parsed.x) || !(0.0..=100.0).contains(&parsed.y) {
            debug!(x = parsed.x, y = parsed.y, "ignoring out-of-range focal point");
            return None;
        }
        Some(Self {
            x: parsed.x,
            y: parsed.y,
        })
    }
}

/// The three words of the weekly prompt an item answered. Only rendered when
/// all three are present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptWords(pub [String; 3]);

impl PromptWords {
    pub fn from_json(raw: &str) -> Option<Self> {
        let words: Vec<String> = match serde_json::from_str(raw) {
            Ok(words) => words,
            Err(err) => {
                debug!(error = ?err, "ignoring malformed prompt words");
                return None;
            }
        };
        let [first, second, third] = <[String; 3]>::try_from(words).ok()?;
        if first.trim().is_empty() || second.trim().is_empty() || third.trim().is_empty() {
            return None;
        }
        Some(Self([first, second, third]))
    }
}

/// One unit of creative work inside an export. An item with neither image
/// nor text still occupies its ordinal slot in the bundle.
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub id: String,
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub image_url: Option<String>,
    pub focal_point: Option<FocalPoint>,
    pub prompt_words: Option<PromptWords>,
}

impl From<SubmissionRow> for ExportItem {
    fn from(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            title: row.title.filter(|title| !title.trim().is_empty()),
            body_html: row.body_html.filter(|body| !body.trim().is_empty()),
            image_url: row.image_url.filter(|url| !url.trim().is_empty()),
            focal_point: row
                .focal_point
                .as_deref()
                .and_then(FocalPoint::from_json),
            prompt_words: row
                .prompt_words
                .as_deref()
                .and_then(PromptWords::from_json),
        }
    }
}

/// Root entity of one export request. Built fresh per request from the
/// store, never persisted.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_id: String,
    pub items: Vec<ExportItem>,
}

/// Identity rendered into attribution lines and canonical URLs.
#[derive(Debug, Clone)]
pub struct Creator {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
}

impl Creator {
    /// URL handle: the public slug when set, otherwise the opaque id.
    pub fn handle(&self) -> &str {
        self.slug
            .as_deref()
            .filter(|slug| !slug.is_empty())
            .unwrap_or(&self.id)
    }
}

impl From<&UserRow> for Creator {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            slug: row.slug.clone(),
        }
    }
}
