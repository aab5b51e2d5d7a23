//! Extraction error types
//!
//! Most extraction misses are not errors at all: they degrade to a sentinel
//! value or a dropped record. The variants here cover what is left over,
//! with `is_recoverable` telling the caller whether to keep going.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Malformed rating '{raw}': {reason}")]
    MalformedRating { raw: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String, field: String },
}

impl ParsingError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn malformed_rating(raw: &str, reason: impl ToString) -> Self {
        Self::MalformedRating {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(field: &str, message: impl ToString) -> Self {
        Self::ConfigurationError {
            message: message.to_string(),
            field: field.to_string(),
        }
    }

    /// Whether the crawl can continue past this error.
    ///
    /// Selector and configuration errors surface while building the
    /// extractor, so they abort setup.
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. }
            | Self::MalformedRating { .. }
            | Self::UrlResolutionFailed { .. } => true,
            Self::InvalidSelector { .. } | Self::ConfigurationError { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
