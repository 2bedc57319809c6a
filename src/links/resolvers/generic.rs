use reqwest::Response;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LOCATION};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::{ResolveFuture, Resolver, network_failure};
use crate::config::{FetchLimits, UrlInfoConfig};
use crate::links::fetcher::{BodyRead, Session, read_bounded};
use crate::links::format::{collapse_whitespace, format_size, quote, truncate_chars};
use crate::links::types::{FetchBudget, ResolverOutcome};

const UNKNOWN_SIZE: &str = "Safety error: unknown size, not reading";

/// Terminal stage: page titles for HTML, type and size for everything else.
pub struct GenericResolver {
    ignored_classes: Vec<String>,
    ignored_apps: Vec<String>,
    limits: FetchLimits,
}

/// Body state once the size is known.
enum Payload {
    Unread(Response),
    Read(Vec<u8>),
}

impl GenericResolver {
    pub fn new(
        ignored_classes: Vec<String>,
        ignored_apps: Vec<String>,
        limits: FetchLimits,
    ) -> Self {
        Self {
            ignored_classes: lowercase_all(ignored_classes),
            ignored_apps: lowercase_all(ignored_apps),
            limits,
        }
    }

    pub fn from_config(config: &UrlInfoConfig) -> Self {
        Self::new(
            config.ignored_classes.clone(),
            config.ignored_apps.clone(),
            config.limits,
        )
    }

    fn budget(&self) -> FetchBudget {
        FetchBudget::from(&self.limits)
    }

    fn is_ignored(&self, content_type: &mime::Mime) -> bool {
        self.ignored_classes
            .iter()
            .any(|class| class == content_type.type_().as_str())
            || self
                .ignored_apps
                .iter()
                .any(|app| app == content_type.subtype().as_str())
    }

    async fn fetch(&self, url: &Url, session: &Session) -> anyhow::Result<ResolverOutcome> {
        let response = match session.get(url).send().await {
            Ok(response) => response,
            Err(e) => return network_failure(e.into()),
        };
        let status = response.status();
        let headers = response.headers();

        if status.is_redirection()
            && let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok())
        {
            let next = url.join(location)?;
            debug!(from = %url, to = %next, status = status.as_u16(), "redirect");
            return Ok(ResolverOutcome::Redirect(next));
        }
        if !status.is_success() {
            let mut fragments = vec![format!("error: HTTP {}", status.as_u16())];
            if let Some(reason) = status.canonical_reason() {
                fragments.push(reason.to_lowercase());
            }
            return Ok(ResolverOutcome::Answer(fragments));
        }

        let content_type = content_type(headers);
        let (size, payload) = match declared_length(headers) {
            Some(length) => (length, Payload::Unread(response)),
            None => match read_bounded(response, self.budget()).await {
                Ok(BodyRead::Complete { size, body }) => (size, Payload::Read(body)),
                Ok(BodyRead::Aborted(reason)) => {
                    debug!(url = %url, ?reason, "refusing body of unknown size");
                    return Ok(ResolverOutcome::text(UNKNOWN_SIZE));
                }
                Err(e) => return network_failure(e),
            },
        };

        if !is_html(&content_type) {
            if self.is_ignored(&content_type) && size < self.limits.ignored_max_bytes {
                return Ok(ResolverOutcome::empty());
            }
            return Ok(ResolverOutcome::answer([
                "Content-Type:".to_string(),
                content_type.essence_str().to_string(),
                "Filesize:".to_string(),
                format_size(size),
            ]));
        }
        if size >= self.limits.html_max_bytes {
            debug!(url = %url, size, "html page too large to parse");
            return Ok(ResolverOutcome::empty());
        }

        let body = match payload {
            Payload::Read(body) => body,
            // A declared length is not trusted to bound the read.
            Payload::Unread(response) => match read_bounded(response, self.budget()).await {
                Ok(BodyRead::Complete { body, .. }) => body,
                Ok(BodyRead::Aborted(_)) => return Ok(ResolverOutcome::empty()),
                Err(e) => return network_failure(e),
            },
        };
        Ok(match page_title(&String::from_utf8_lossy(&body)) {
            Some(title) => ResolverOutcome::text(quote(&truncate_chars(
                &title,
                self.limits.max_title_chars,
            ))),
            None => ResolverOutcome::empty(),
        })
    }
}

impl Resolver for GenericResolver {
    fn name(&self) -> &str {
        "generic"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(self.fetch(url, session))
    }
}

fn lowercase_all(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.to_ascii_lowercase())
        .collect()
}

/// Declared body length; zero counts as undeclared.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&length| length > 0)
}

fn content_type(headers: &HeaderMap) -> mime::Mime {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(mime::TEXT_HTML)
}

fn is_html(content_type: &mime::Mime) -> bool {
    let (class, subtype) = (content_type.type_(), content_type.subtype());
    (class == mime::TEXT && subtype == mime::HTML)
        || (class == mime::APPLICATION && subtype == "xhtml")
}

fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let element = document.select(&selector).next()?;
    let title = collapse_whitespace(&element.text().collect::<String>());
    (!title.is_empty()).then_some(title)
}
