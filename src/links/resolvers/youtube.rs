use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{
    ApiReply, ResolveFuture, Resolver, api_url, fetch_json, network_failure, response_code,
};
use crate::config::YoutubeConfig;
use crate::links::fetcher::Session;
use crate::links::format::{format_duration, parse_iso8601_duration, quote};
use crate::links::types::ResolverOutcome;

const CANONICAL_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];
const SHORT_HOST: &str = "youtu.be";
const PATH_FORMS: &[&str] = &["shorts", "embed", "live", "v"];

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    snippet: Snippet,
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Extract the video id from a watch, short-form or `youtu.be` URL.
pub(crate) fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let id = if host == SHORT_HOST {
        segments.next().map(str::to_string)
    } else if CANONICAL_HOSTS.contains(&host.as_str()) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(form) if PATH_FORMS.contains(&form) => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };
    id.filter(|id| {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Video title and length from the Data API.
pub struct YoutubeResolver {
    api_key: Option<String>,
    api_base: Url,
}

impl YoutubeResolver {
    pub fn new(api_key: Option<String>, api_base: Url) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()),
            api_base,
        }
    }

    pub fn from_config(config: &YoutubeConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.api_key.clone(), Url::parse(&config.api_base)?))
    }

    async fn lookup(
        &self,
        session: &Session,
        key: &str,
        id: &str,
    ) -> anyhow::Result<ResolverOutcome> {
        let url = api_url(&self.api_base, "/youtube/v3/videos")?;
        let request = session.api_get(&url).query(&[
            ("id", id),
            ("hl", "en"),
            ("key", key),
            ("part", "snippet,contentDetails"),
        ]);
        let list: VideoList = match fetch_json(request, session.api_budget()).await {
            Ok(ApiReply::Parsed(list)) => list,
            Ok(ApiReply::Status(status)) => return Ok(response_code(status)),
            Ok(ApiReply::Invalid(e)) => {
                warn!(id, error = %e, "invalid youtube response");
                return Ok(ResolverOutcome::text("invalid response from YouTube API"));
            }
            Err(e) => return network_failure(e),
        };
        let Some(video) = list.items.into_iter().next() else {
            return Ok(ResolverOutcome::text("Video not found"));
        };

        let title = quote(&video.snippet.title);
        Ok(match parse_iso8601_duration(&video.content_details.duration) {
            Some(secs) => ResolverOutcome::text(format!("{title} ({})", format_duration(secs))),
            None => {
                warn!(id, duration = %video.content_details.duration, "unparsable video duration");
                ResolverOutcome::text(title)
            }
        })
    }
}

impl Resolver for YoutubeResolver {
    fn name(&self) -> &str {
        "youtube"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(async move {
            let (Some(key), Some(id)) = (self.api_key.as_deref(), video_id(url)) else {
                return Ok(ResolverOutcome::NoMatch);
            };
            self.lookup(session, key, &id).await
        })
    }
}
