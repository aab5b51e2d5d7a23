//! Review, item and output row records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored in place of an item field that could not be extracted.
pub const NOT_FOUND: &str = "not found";

/// A single extracted review: normalized text plus a numeric rating.
///
/// Fields are private so a record cannot be mutated between extraction and
/// the sink; construct through [`ReviewRecord::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    text: String,
    rating: u8,
}

impl ReviewRecord {
    pub fn new(text: impl Into<String>, rating: u8) -> Self {
        Self {
            text: text.into(),
            rating,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn rating(&self) -> u8 {
        self.rating
    }

    /// Same rating, replaced text. Used by the normalizer pass.
    #[must_use]
    pub fn with_text(self, text: String) -> Self {
        Self { text, ..self }
    }
}

/// Item-level metadata, one per item page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub description: String,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Both fields set to [`NOT_FOUND`].
    pub fn not_found() -> Self {
        Self::new(NOT_FOUND, NOT_FOUND)
    }

    pub fn is_complete(&self) -> bool {
        self.name != NOT_FOUND && self.description != NOT_FOUND
    }
}

impl Default for ItemRecord {
    fn default() -> Self {
        Self::not_found()
    }
}

/// Flattened unit written to the output file.
///
/// Serialized field order is the column order of the CSV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "ItemName")]
    pub item_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "ReviewText")]
    pub review_text: String,
    #[serde(rename = "Rating")]
    pub rating: u8,
}

impl OutputRow {
    pub const HEADER: [&'static str; 4] = ["ItemName", "Description", "ReviewText", "Rating"];

    pub fn new(item: &ItemRecord, review: &ReviewRecord) -> Self {
        Self {
            item_name: item.name.clone(),
            description: item.description.clone(),
            review_text: review.text().to_string(),
            rating: review.rating(),
        }
    }

    /// Join an item with each of its reviews.
    pub fn join(item: &ItemRecord, reviews: &[ReviewRecord]) -> Vec<Self> {
        reviews.iter().map(|review| Self::new(item, review)).collect()
    }
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.item_name, self.rating, self.review_text)
    }
}
