use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `onebot`.
///
/// Library callers can match on these to decide recovery strategy; resolver
/// code continues to use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum OnebotError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Fetch / HTTP ────────────────────────────────────────────────────
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Fetch errors ───────────────────────────────────────────────────────────

/// Failures of a single outbound HTTP exchange.
///
/// `Timeout` and `Connect` are the transient kinds resolvers render inline;
/// the rest bubble up to the per-URL boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("http: {0}")]
    Http(reqwest::Error),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, OnebotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = OnebotError::Config(ConfigError::Validation("max_redirects is 0".into()));
        assert!(err.to_string().contains("validation failed"));
        assert!(err.to_string().contains("max_redirects"));
    }

    #[test]
    fn timeout_is_transient() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Connect("refused".into()).is_transient());
        assert!(!FetchError::InvalidUrl("nope".into()).is_transient());
    }

    #[test]
    fn url_parse_error_converts() {
        let err: FetchError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: OnebotError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn fetch_error_wraps_into_top_level() {
        let err: OnebotError = FetchError::Timeout.into();
        assert_eq!(err.to_string(), "fetch: request timed out");
    }
}
