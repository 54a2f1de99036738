use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Media type the photo filter looks for.
pub const PHOTO_MEDIA_TYPE: &str = "photo";

/// Largest page the search endpoint is asked for by default.
pub const MAX_TWEET_COUNT: u32 = 15;

/// Placeholder replaced with `@<author>` when a reply template is rendered.
pub const SCREEN_NAME_PLACEHOLDER: &str = "$SCREEN_NAME$";

/// Post identifier in canonical decimal form.
///
/// Ids are compared as arbitrary precision integers: a shorter canonical string
/// is always smaller, equal lengths compare digit by digit. Ids are never routed
/// through a float or fixed-width integer, so values beyond 2^53 keep their order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId(String);

impl PostId {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidInput {
                message: format!("'{}' is not a valid post id", raw),
            });
        }

        let canonical = raw.trim_start_matches('0');
        let canonical = if canonical.is_empty() { "0" } else { canonical };
        Ok(Self(canonical.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }
}

impl Ord for PostId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for PostId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: String,
}

impl MediaItem {
    pub fn is_photo(&self) -> bool {
        self.kind == PHOTO_MEDIA_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub author_handle: String,
    pub text: String,
    pub is_retweet: bool,
    pub media: Vec<MediaItem>,
}

impl Post {
    pub fn has_photo(&self) -> bool {
        self.media.iter().any(MediaItem::is_photo)
    }
}

/// Per-run settings. Built once from [`crate::AppConfig`] and never mutated
/// while a run is in progress.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub search_query: String,
    pub exclude_handles: HashSet<String>,
    pub photos_only: bool,
    pub reply_templates: Vec<String>,
    pub max_fetch_count: u32,
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            exclude_handles: HashSet::new(),
            photos_only: false,
            reply_templates: Vec::new(),
            max_fetch_count: MAX_TWEET_COUNT,
            dry_run: false,
        }
    }
}

/// One page request against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub since_id: Option<PostId>,
    pub count: u32,
}
