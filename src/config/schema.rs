use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub urlinfo: UrlInfoConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.urlinfo.validate()
    }

    /// Copy with every credential replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |value: &mut Option<String>| {
            if value.is_some() {
                *value = Some("***".into());
            }
        };
        mask(&mut copy.urlinfo.youtube.api_key);
        mask(&mut copy.urlinfo.twitter.bearer_token);
        copy
    }
}

/// Settings of the URL info pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlInfoConfig {
    /// MIME major classes (`image`, `text`, ...) not worth reporting.
    #[serde(default = "default_ignored_classes")]
    pub ignored_classes: Vec<String>,
    /// MIME subtypes (`pdf`, ...) not worth reporting.
    #[serde(default = "default_ignored_apps")]
    pub ignored_apps: Vec<String>,
    /// Channels the dispatcher never resolves URLs in.
    #[serde(default)]
    pub ignored_channels: Vec<String>,
    /// Senders whose URLs are never resolved.
    #[serde(default)]
    pub ignored_nicks: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Cookie store applied to every fetch (see `onebot cookies login`).
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Dumb host rewrite table, `from = "to"`.
    #[serde(default)]
    pub urlmap: BTreeMap<String, String>,
    #[serde(default)]
    pub limits: FetchLimits,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
}

fn default_ignored_classes() -> Vec<String> {
    vec!["image".into(), "text".into()]
}

fn default_ignored_apps() -> Vec<String> {
    vec!["pdf".into()]
}

fn default_user_agent() -> String {
    "script:onebot:irc".into()
}

fn default_accept_language() -> String {
    "en-GB, en-US, en, nl-NL, nl".into()
}

impl Default for UrlInfoConfig {
    fn default() -> Self {
        Self {
            ignored_classes: default_ignored_classes(),
            ignored_apps: default_ignored_apps(),
            ignored_channels: Vec::new(),
            ignored_nicks: Vec::new(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            cookie_file: None,
            urlmap: BTreeMap::new(),
            limits: FetchLimits::default(),
            youtube: YoutubeConfig::default(),
            twitter: TwitterConfig::default(),
            reddit: RedditConfig::default(),
        }
    }
}

impl UrlInfoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        for (from, to) in &self.urlmap {
            if from.eq_ignore_ascii_case(to) {
                return Err(ConfigError::Validation(format!(
                    "urlmap entry '{from}' maps onto itself"
                )));
            }
            if to.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "urlmap entry '{from}' has an empty target"
                )));
            }
        }
        for (name, base) in [
            ("youtube.api_base", &self.youtube.api_base),
            ("twitter.api_base", &self.twitter.api_base),
            ("reddit.api_base", &self.reddit.api_base),
        ] {
            Url::parse(base)
                .map_err(|e| ConfigError::Validation(format!("{name} '{base}': {e}")))?;
        }
        if self.reddit.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "reddit.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Size and time ceilings for every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchLimits {
    /// Redirects followed per URL before giving up.
    pub max_redirects: usize,
    /// Connect and read timeout of page fetches.
    pub fetch_timeout_secs: u64,
    /// Total timeout of platform API calls.
    pub api_timeout_secs: u64,
    /// Byte ceiling of a body without a declared length.
    pub stream_max_bytes: u64,
    /// Wall-clock ceiling of a body without a declared length.
    pub stream_max_secs: u64,
    /// Prefix of a streamed body retained for title parsing.
    pub body_keep_bytes: usize,
    /// HTML larger than this is not parsed.
    pub html_max_bytes: u64,
    /// Ignored content types at or above this size are reported anyway.
    pub ignored_max_bytes: u64,
    /// Titles and post texts longer than this are cut with an ellipsis.
    pub max_title_chars: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            fetch_timeout_secs: 4,
            api_timeout_secs: 6,
            stream_max_bytes: 30 * MIB,
            stream_max_secs: 10,
            body_keep_bytes: 5 * 1024 * 1024,
            html_max_bytes: 2 * MIB,
            ignored_max_bytes: 5 * MIB,
            max_title_chars: 320,
        }
    }
}

impl FetchLimits {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_max_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("max_redirects", self.max_redirects == 0),
            ("fetch_timeout_secs", self.fetch_timeout_secs == 0),
            ("api_timeout_secs", self.api_timeout_secs == 0),
            ("stream_max_bytes", self.stream_max_bytes == 0),
            ("stream_max_secs", self.stream_max_secs == 0),
            ("html_max_bytes", self.html_max_bytes == 0),
            ("max_title_chars", self.max_title_chars == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Validation(format!(
                "limits.{name} must be greater than zero"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com".into()
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_youtube_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

fn default_twitter_api_base() -> String {
    "https://api.x.com".into()
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            api_base: default_twitter_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reddit_api_base")]
    pub api_base: String,
    /// Attempts per API call while rate limited.
    #[serde(default = "default_reddit_attempts")]
    pub max_attempts: u32,
    /// Linear backoff step between rate-limited attempts.
    #[serde(default = "default_reddit_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_reddit_api_base() -> String {
    "https://www.reddit.com".into()
}

fn default_reddit_attempts() -> u32 {
    3
}

fn default_reddit_backoff_ms() -> u64 {
    500
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_reddit_api_base(),
            max_attempts: default_reddit_attempts(),
            backoff_ms: default_reddit_backoff_ms(),
        }
    }
}

impl RedditConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.urlinfo.ignored_classes, vec!["image", "text"]);
        assert_eq!(config.urlinfo.ignored_apps, vec!["pdf"]);
        assert_eq!(config.urlinfo.limits, FetchLimits::default());
        assert!(config.urlinfo.reddit.enabled);
        assert!(config.urlinfo.youtube.api_key.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_urlmap_and_partial_limits() {
        let config: Config = toml::from_str(
            r#"
            [urlinfo]
            ignored_nicks = ["spambot"]

            [urlinfo.urlmap]
            "old.example.com" = "new.example.com"

            [urlinfo.limits]
            max_redirects = 3
            "#,
        )
        .unwrap();
        assert_eq!(
            config.urlinfo.urlmap.get("old.example.com").map(String::as_str),
            Some("new.example.com")
        );
        assert_eq!(config.urlinfo.limits.max_redirects, 3);
        assert_eq!(config.urlinfo.limits.fetch_timeout_secs, 4);
        assert_eq!(config.urlinfo.ignored_nicks, vec!["spambot"]);
    }

    #[test]
    fn rejects_self_mapping() {
        let mut config = UrlInfoConfig::default();
        config
            .urlmap
            .insert("loop.example.com".into(), "LOOP.example.com".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("maps onto itself"));
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = UrlInfoConfig::default();
        config.limits.max_title_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_title_chars"));
    }

    #[test]
    fn rejects_bad_api_base() {
        let mut config = UrlInfoConfig::default();
        config.youtube.api_base = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn redacted_masks_credentials() {
        let mut config = Config::default();
        config.urlinfo.twitter.bearer_token = Some("secret-token".into());
        let shown = config.redacted();
        assert_eq!(shown.urlinfo.twitter.bearer_token.as_deref(), Some("***"));
        assert!(shown.urlinfo.youtube.api_key.is_none());
    }
}
