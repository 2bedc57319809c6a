//! Resolver stages of the URL chain.
//!
//! Each stage looks at one URL and returns a [`ResolverOutcome`]. Ordinary
//! decisions are always `Ok`; an `Err` means something unexpected happened
//! and costs only the annotation of that URL.

mod generic;
mod reddit;
mod remap;
mod safety;
mod twitter;
mod youtube;

pub use generic::GenericResolver;
pub use reddit::{RedditResolver, RedditTarget};
pub use remap::HostRemap;
pub use safety::SafetyGate;
pub use twitter::TwitterResolver;
pub use youtube::YoutubeResolver;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::fetcher::{AbortReason, BodyRead, Session, read_bounded};
use super::types::{FetchBudget, ResolverOutcome};
use crate::config::UrlInfoConfig;
use crate::error::FetchError;
use crate::security::HostLookup;

pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<ResolverOutcome>> + Send + 'a>>;

/// One pluggable stage of the resolver chain.
pub trait Resolver: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &str;

    fn try_resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> ResolveFuture<'a>;
}

/// The standard stage order: safety first, generic title lookup last.
pub fn default_stages(
    config: &UrlInfoConfig,
    lookup: Arc<dyn HostLookup>,
) -> anyhow::Result<Vec<Box<dyn Resolver>>> {
    Ok(vec![
        Box::new(SafetyGate::new(lookup)),
        Box::new(HostRemap::new(&config.urlmap)),
        Box::new(TwitterResolver::from_config(&config.twitter, &config.limits)?),
        Box::new(RedditResolver::from_config(&config.reddit)?),
        Box::new(YoutubeResolver::from_config(&config.youtube)?),
        Box::new(GenericResolver::from_config(config)),
    ])
}

/// Render a transient failure inline; anything else is unexpected.
pub(crate) fn network_failure(err: FetchError) -> anyhow::Result<ResolverOutcome> {
    if !err.is_transient() {
        return Err(err.into());
    }
    Ok(ResolverOutcome::text(match err {
        FetchError::Timeout => "Timeout",
        _ => "Connection failed",
    }))
}

pub(crate) fn response_code(status: StatusCode) -> ResolverOutcome {
    ResolverOutcome::text(format!("got response code {}", status.as_u16()))
}

/// Reply of a JSON API call.
pub(crate) enum ApiReply<T> {
    Parsed(T),
    Status(StatusCode),
    Invalid(String),
}

/// Send an API request and decode its JSON body, read under `budget`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    budget: FetchBudget,
) -> Result<ApiReply<T>, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Ok(ApiReply::Status(status));
    }
    let bytes = match read_bounded(response, budget).await? {
        BodyRead::Complete { body, .. } => body,
        BodyRead::Aborted(AbortReason::TooSlow) => return Err(FetchError::Timeout),
        BodyRead::Aborted(AbortReason::TooLarge) => {
            return Ok(ApiReply::Invalid(format!(
                "body exceeds {} bytes",
                budget.max_bytes
            )));
        }
    };
    Ok(match serde_json::from_slice(&bytes) {
        Ok(value) => ApiReply::Parsed(value),
        Err(e) => ApiReply::Invalid(e.to_string()),
    })
}

/// `host` is `domain` itself or one of its subdomains.
pub(crate) fn host_within(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Join `path` onto an API base URL that may itself carry a path prefix.
pub(crate) fn api_url(base: &Url, path: &str) -> Result<Url, FetchError> {
    let mut joined = base.as_str().trim_end_matches('/').to_string();
    joined.push_str(path);
    Ok(Url::parse(&joined)?)
}
