use std::time::Duration;
use url::Url;

use crate::config::FetchLimits;

/// Ordered text fragments describing one URL; empty means nothing to say.
pub type Annotation = Vec<String>;

/// What a single resolver stage decided about a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    /// Final annotation for the URL.
    Answer(Annotation),
    /// Deliberately say nothing about the URL.
    Skip,
    /// Restart the whole chain on another URL.
    Redirect(Url),
    /// Not this stage's business; try the next one.
    NoMatch,
}

impl ResolverOutcome {
    pub fn answer<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Answer(fragments.into_iter().map(Into::into).collect())
    }

    pub fn text(fragment: impl Into<String>) -> Self {
        Self::Answer(vec![fragment.into()])
    }

    pub fn empty() -> Self {
        Self::Answer(Vec::new())
    }
}

/// Dual ceiling on a body whose length the server did not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBudget {
    pub max_bytes: u64,
    pub max_duration: Duration,
    /// Leading bytes retained for parsing; counting continues past it.
    pub keep_bytes: usize,
}

impl From<&FetchLimits> for FetchBudget {
    fn from(limits: &FetchLimits) -> Self {
        Self {
            max_bytes: limits.stream_max_bytes,
            max_duration: limits.stream_timeout(),
            keep_bytes: limits.body_keep_bytes,
        }
    }
}

/// One chat line handed over by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub target: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        sender: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            target: target.into(),
            text: text.into(),
        }
    }

    pub fn is_channel(&self) -> bool {
        self.target.starts_with('#') || self.target.starts_with('&')
    }
}
