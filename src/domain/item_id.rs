//! Canonical item identifier used by the dedup ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Canonical item URL.
///
/// The fragment is dropped and a trailing `/` on the path is trimmed. The
/// query is kept because some catalogs carry the item id there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Canonicalize an absolute URL.
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Url::parse(url.trim()).map(|u| Self::from_url(&u))
    }

    /// Resolve `href` against `base` and canonicalize the result.
    pub fn resolve(base: &str, href: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base)?;
        base.join(href.trim()).map(|u| Self::from_url(&u))
    }

    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let path = url.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            url.set_path(path.trim_end_matches('/'));
        }
        Self(url.into())
    }

    /// Wrap an already-canonical value, e.g. a line read back from the ledger.
    pub(crate) fn from_canonical(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
