use responder_core::{Post, RunConfig};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SelfAuthored,
    Excluded,
    Retweet,
    NoPhoto,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SelfAuthored => "self",
            SkipReason::Excluded => "excluded",
            SkipReason::Retweet => "retweet",
            SkipReason::NoPhoto => "no-photo",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Skip(SkipReason),
}

impl Decision {
    pub fn is_keep(&self) -> bool {
        matches!(self, Decision::Keep)
    }
}

/// Decide whether `post` should be answered.
///
/// Rules run in a fixed order and the first match wins: own posts, excluded
/// authors, retweets, then the photo requirement.
pub fn decide(post: &Post, config: &RunConfig, self_handle: &str) -> Decision {
    if post.author_handle == self_handle {
        return Decision::Skip(SkipReason::SelfAuthored);
    }

    if config.exclude_handles.contains(&post.author_handle) {
        return Decision::Skip(SkipReason::Excluded);
    }

    if post.is_retweet {
        return Decision::Skip(SkipReason::Retweet);
    }

    if config.photos_only && !post.has_photo() {
        return Decision::Skip(SkipReason::NoPhoto);
    }

    Decision::Keep
}
