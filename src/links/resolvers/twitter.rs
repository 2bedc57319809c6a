use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{
    ApiReply, ResolveFuture, Resolver, api_url, fetch_json, host_within, network_failure,
    response_code,
};
use crate::config::{FetchLimits, TwitterConfig};
use crate::links::fetcher::Session;
use crate::links::format::{collapse_whitespace, quote, truncate_chars};
use crate::links::types::ResolverOutcome;

const PLATFORM: &str = "X (formerly Twitter)";
const VERIFIED: &str = "✓";

static STATUS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?P<handle>[A-Za-z0-9_]{1,15})/status(?:es)?/(?P<id>\d+)(?:/.*)?$").unwrap()
});
static PROFILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<handle>[A-Za-z0-9_]{1,15})/?$").unwrap());

/// First path segments that are site pages rather than accounts.
const RESERVED_PATHS: &[&str] = &[
    "compose",
    "explore",
    "hashtag",
    "home",
    "i",
    "intent",
    "login",
    "logout",
    "messages",
    "notifications",
    "privacy",
    "search",
    "settings",
    "share",
    "signup",
    "tos",
];

/// Posts and profiles on X/Twitter, looked up through the v2 API.
pub struct TwitterResolver {
    bearer_token: Option<String>,
    api_base: Url,
    max_text_chars: usize,
}

#[derive(Debug, Deserialize)]
struct PostEnvelope {
    data: Option<Post>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Post {
    text: String,
    author_id: String,
    #[serde(default)]
    in_reply_to_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    name: String,
    username: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<User>,
}

fn is_platform_host(host: &str) -> bool {
    host_within(host, "twitter.com") || host_within(host, "x.com")
}

impl TwitterResolver {
    pub fn new(bearer_token: Option<String>, api_base: Url, max_text_chars: usize) -> Self {
        Self {
            bearer_token: bearer_token.filter(|token| !token.is_empty()),
            api_base,
            max_text_chars,
        }
    }

    pub fn from_config(config: &TwitterConfig, limits: &FetchLimits) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.bearer_token.clone(),
            Url::parse(&config.api_base)?,
            limits.max_title_chars,
        ))
    }

    async fn post(
        &self,
        session: &Session,
        token: &str,
        handle: &str,
        id: &str,
    ) -> anyhow::Result<ResolverOutcome> {
        let url = api_url(&self.api_base, &format!("/2/tweets/{id}"))?;
        let request = session
            .api_get(&url)
            .bearer_auth(token)
            .query(&[
                ("expansions", "author_id,in_reply_to_user_id"),
                ("user.fields", "name,username,verified"),
            ]);
        let envelope: PostEnvelope = match fetch_json(request, session.api_budget()).await {
            Ok(ApiReply::Parsed(envelope)) => envelope,
            Ok(ApiReply::Status(StatusCode::NOT_FOUND)) => {
                return Ok(ResolverOutcome::text("Post not found"));
            }
            Ok(ApiReply::Status(status)) => return Ok(response_code(status)),
            Ok(ApiReply::Invalid(e)) => {
                warn!(id, error = %e, "invalid X post response");
                return Ok(ResolverOutcome::text("invalid response from X API"));
            }
            Err(e) => return network_failure(e),
        };

        let Some(post) = envelope.data else {
            return Ok(ResolverOutcome::text("Post not found"));
        };
        let users = &envelope.includes.users;
        let author = users.iter().find(|user| user.id == post.author_id);
        // Only answer for the account named in the link, so ids of suspended
        // or renamed accounts cannot be mapped to their handles.
        let Some(author) = author.filter(|user| user.username.eq_ignore_ascii_case(handle)) else {
            debug!(id, handle, "post author does not match linked handle");
            return Ok(ResolverOutcome::text("Post not found"));
        };

        let mut fragments = vec![author.name.clone(), format!("(@{})", author.username)];
        if author.verified {
            fragments.push(VERIFIED.to_string());
        }
        if let Some(reply_to) = post
            .in_reply_to_user_id
            .as_ref()
            .and_then(|id| users.iter().find(|user| &user.id == id))
        {
            fragments.push(format!("replying to @{}", reply_to.username));
        }
        let text = truncate_chars(&collapse_whitespace(&post.text), self.max_text_chars);
        fragments.push(quote(&text));
        Ok(ResolverOutcome::Answer(fragments))
    }

    async fn profile(
        &self,
        session: &Session,
        token: &str,
        handle: &str,
    ) -> anyhow::Result<ResolverOutcome> {
        let url = api_url(&self.api_base, &format!("/2/users/by/username/{handle}"))?;
        let request = session
            .api_get(&url)
            .bearer_auth(token)
            .query(&[("user.fields", "name,username,verified,description")]);
        let user = match fetch_json::<UserEnvelope>(request, session.api_budget()).await {
            Ok(ApiReply::Parsed(UserEnvelope { data: Some(user) })) => user,
            Ok(ApiReply::Parsed(_) | ApiReply::Status(StatusCode::NOT_FOUND)) => {
                return Ok(ResolverOutcome::text("User not found"));
            }
            Ok(ApiReply::Status(status)) => return Ok(response_code(status)),
            Ok(ApiReply::Invalid(e)) => {
                warn!(handle, error = %e, "invalid X user response");
                return Ok(ResolverOutcome::text("invalid response from X API"));
            }
            Err(e) => return network_failure(e),
        };

        let mut fragments = vec![user.name, format!("(@{})", user.username)];
        if user.verified {
            fragments.push(VERIFIED.to_string());
        }
        let bio = collapse_whitespace(user.description.as_deref().unwrap_or_default());
        if !bio.is_empty() {
            fragments.push(quote(&truncate_chars(&bio, self.max_text_chars)));
        }
        Ok(ResolverOutcome::Answer(fragments))
    }
}

impl Resolver for TwitterResolver {
    fn name(&self) -> &str {
        "twitter"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(async move {
            if !url.host_str().is_some_and(is_platform_host) {
                return Ok(ResolverOutcome::NoMatch);
            }
            let Some(token) = self.bearer_token.as_deref() else {
                return Ok(ResolverOutcome::Skip);
            };

            let path = url.path();
            if let Some(caps) = STATUS_PATH.captures(path) {
                return self.post(session, token, &caps["handle"], &caps["id"]).await;
            }
            if let Some(caps) = PROFILE_PATH.captures(path) {
                let handle = &caps["handle"];
                if !RESERVED_PATHS.contains(&handle.to_ascii_lowercase().as_str()) {
                    return self.profile(session, token, handle).await;
                }
            }
            Ok(ResolverOutcome::text(PLATFORM))
        })
    }
}
