//! Crawl entry points
//!
//! A seed is either a catalog listing (walk pages, open each item) or a
//! single item page. Seeds come from the command line, a seed file, or the
//! config file, where a numeric URL template can stand for a whole id range.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Placeholder replaced by the numeric id in [`SeedSpec::Template`].
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    #[default]
    Catalog,
    Item,
}

impl fmt::Display for SeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("catalog"),
            Self::Item => f.write_str("item"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Template '{template}' has no {ID_PLACEHOLDER} placeholder")]
    MissingPlaceholder { template: String },

    #[error("Template range {start}..={end} is empty")]
    EmptyRange { start: u64, end: u64 },
}

/// A validated crawl entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    url: String,
    kind: SeedKind,
}

impl Seed {
    /// Accepts absolute http(s) URLs only.
    pub fn new(url: &str, kind: SeedKind) -> Result<Self, SeedError> {
        let url = url.trim();
        let parsed = Url::parse(url).map_err(|e| SeedError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SeedError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(Self {
            url: url.to_string(),
            kind,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn kind(&self) -> SeedKind {
        self.kind
    }

    /// One seed per non-empty line; `#` starts a comment line.
    pub fn parse_lines(text: &str, kind: SeedKind) -> Vec<Result<Self, SeedError>> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| Self::new(line, kind))
            .collect()
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

/// Seed entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    Template {
        template: String,
        start: u64,
        end: u64,
        #[serde(default)]
        kind: SeedKind,
    },
    Url {
        url: String,
        #[serde(default)]
        kind: SeedKind,
    },
}

impl SeedSpec {
    /// Expand into concrete seeds, ascending id order for templates.
    pub fn expand(&self) -> Vec<Result<Seed, SeedError>> {
        match self {
            Self::Url { url, kind } => vec![Seed::new(url, *kind)],
            Self::Template {
                template,
                start,
                end,
                kind,
            } => {
                if !template.contains(ID_PLACEHOLDER) {
                    return vec![Err(SeedError::MissingPlaceholder {
                        template: template.clone(),
                    })];
                }
                if start > end {
                    return vec![Err(SeedError::EmptyRange {
                        start: *start,
                        end: *end,
                    })];
                }
                (*start..=*end)
                    .map(|id| Seed::new(&template.replace(ID_PLACEHOLDER, &id.to_string()), *kind))
                    .collect()
            }
        }
    }
}
