use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{
    ApiReply, ResolveFuture, Resolver, api_url, fetch_json, host_within, network_failure,
    response_code,
};
use crate::config::RedditConfig;
use crate::error::FetchError;
use crate::links::fetcher::Session;
use crate::links::format::quote;
use crate::links::types::ResolverOutcome;

const SITE: &str = "Reddit";

static USER_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/u(?:ser)?/(?P<user>[^/]+)/?$").unwrap());
static COMMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/r/[^/]+/comments/(?P<thread>[A-Za-z0-9]+)/[^/]*/(?P<comment>[A-Za-z0-9]+)/?$")
        .unwrap()
});
static THREAD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/r/[^/]+)?/comments/(?P<thread>[A-Za-z0-9]+)(?:/[^/]*)?/?$").unwrap()
});
static SHORT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<thread>[A-Za-z0-9]+)/?$").unwrap());

/// What a reddit link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedditTarget {
    User(String),
    Thread(String),
    Comment { thread: String, comment: String },
}

impl RedditTarget {
    /// Classify a URL; `None` for foreign hosts, `Some(None)` for reddit
    /// pages that are none of the known kinds.
    pub fn classify(url: &Url) -> Option<Option<Self>> {
        let host = url.host_str()?;
        let path = url.path();
        if host == "redd.it" {
            return Some(
                SHORT_PATH
                    .captures(path)
                    .map(|caps| Self::Thread(caps["thread"].to_string())),
            );
        }
        if !host_within(host, "reddit.com") {
            return None;
        }
        if let Some(caps) = USER_PATH.captures(path) {
            return Some(Some(Self::User(caps["user"].to_string())));
        }
        if let Some(caps) = COMMENT_PATH.captures(path) {
            return Some(Some(Self::Comment {
                thread: caps["thread"].to_string(),
                comment: caps["comment"].to_string(),
            }));
        }
        Some(
            THREAD_PATH
                .captures(path)
                .map(|caps| Self::Thread(caps["thread"].to_string())),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Account {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Submission {
    subreddit: String,
    title: String,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    subreddit: String,
    #[serde(default)]
    author: Option<String>,
}

/// `[submission listing, comment listing]` as served for a thread page.
#[derive(Debug, Deserialize)]
struct ThreadPage(Thing<Listing<Submission>>, Thing<Listing<Comment>>);

/// Reddit users, threads and comments through the public JSON endpoints.
pub struct RedditResolver {
    enabled: bool,
    api_base: Url,
    max_attempts: u32,
    backoff: Duration,
}

impl RedditResolver {
    pub fn new(enabled: bool, api_base: Url, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            enabled,
            api_base,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RedditConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.enabled,
            Url::parse(&config.api_base)?,
            config.max_attempts,
            config.backoff(),
        ))
    }

    /// GET with a linear backoff while the API answers 429.
    async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<ApiReply<T>, FetchError> {
        let url = api_url(&self.api_base, path)?;
        let mut attempt = 1;
        loop {
            let request = session.api_get(&url).query(&[("raw_json", "1")]);
            match fetch_json(request, session.api_budget()).await? {
                ApiReply::Status(StatusCode::TOO_MANY_REQUESTS) if attempt < self.max_attempts => {
                    debug!(url = %url, attempt, "rate limited by reddit");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                reply => return Ok(reply),
            }
        }
    }

    async fn resolve_target(
        &self,
        session: &Session,
        target: &RedditTarget,
    ) -> Result<ResolverOutcome, FetchError> {
        Ok(match target {
            RedditTarget::User(name) => {
                match self
                    .get::<Thing<Account>>(session, &format!("/user/{name}/about.json"))
                    .await?
                {
                    ApiReply::Parsed(account) => {
                        ResolverOutcome::text(format!("/u/{} on {SITE}", account.data.name))
                    }
                    reply => failure(reply, "User not found"),
                }
            }
            RedditTarget::Thread(id) => {
                match self
                    .get::<ThreadPage>(session, &format!("/comments/{id}.json"))
                    .await?
                {
                    ApiReply::Parsed(page) => match page.0.data.children.into_iter().next() {
                        Some(Thing { data: submission }) => {
                            let mut fragments =
                                vec![format!("/r/{}:", submission.subreddit), quote(&submission.title)];
                            if let Some(author) = submission.author {
                                fragments.push("by".into());
                                fragments.push(format!("/u/{author}"));
                            }
                            ResolverOutcome::Answer(fragments)
                        }
                        None => ResolverOutcome::text("Thread not found"),
                    },
                    reply => failure(reply, "Thread not found"),
                }
            }
            RedditTarget::Comment { thread, comment } => {
                match self
                    .get::<ThreadPage>(session, &format!("/comments/{thread}/_/{comment}.json"))
                    .await?
                {
                    ApiReply::Parsed(page) => {
                        let submission = page.0.data.children.into_iter().next();
                        let comment = page.1.data.children.into_iter().next();
                        match (submission, comment) {
                            (Some(Thing { data: submission }), Some(Thing { data: comment })) => {
                                ResolverOutcome::answer([
                                    format!("/r/{}", comment.subreddit),
                                    "comment by".to_string(),
                                    comment.author.unwrap_or_else(|| "[deleted]".into()),
                                    "on".to_string(),
                                    quote(&submission.title),
                                ])
                            }
                            _ => ResolverOutcome::text("Comment not found"),
                        }
                    }
                    reply => failure(reply, "Comment not found"),
                }
            }
        })
    }
}

fn failure<T>(reply: ApiReply<T>, not_found: &str) -> ResolverOutcome {
    match reply {
        ApiReply::Status(StatusCode::NOT_FOUND) => ResolverOutcome::text(not_found),
        ApiReply::Status(status) => response_code(status),
        ApiReply::Invalid(e) => {
            warn!(error = %e, "invalid reddit response");
            ResolverOutcome::text("invalid response from Reddit")
        }
        ApiReply::Parsed(_) => ResolverOutcome::text(not_found),
    }
}

impl Resolver for RedditResolver {
    fn name(&self) -> &str {
        "reddit"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(async move {
            let Some(target) = RedditTarget::classify(url) else {
                return Ok(ResolverOutcome::NoMatch);
            };
            if !self.enabled {
                return Ok(ResolverOutcome::Skip);
            }
            let Some(target) = target else {
                warn!(url = %url, "unrecognised reddit url");
                return Ok(ResolverOutcome::text(SITE));
            };
            match self.resolve_target(session, &target).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => network_failure(e),
            }
        })
    }
}
