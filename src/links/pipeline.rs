use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::assembler::assemble;
use super::chain::ResolverChain;
use super::detector::find_urls;
use super::fetcher::SessionSettings;
use super::resolvers::{Resolver, default_stages};
use super::types::{Annotation, InboundMessage};
use crate::config::{CookieStore, UrlInfoConfig};
use crate::security::{HostLookup, SystemLookup};

/// The URL annotation pipeline: text in, at most one line out.
pub struct UrlInfo {
    chain: ResolverChain,
    session: SessionSettings,
    ignored_channels: Vec<String>,
    ignored_nicks: Vec<String>,
}

impl UrlInfo {
    pub fn new(
        stages: Vec<Box<dyn Resolver>>,
        session: SessionSettings,
        max_redirects: usize,
    ) -> Self {
        Self {
            chain: ResolverChain::new(stages, max_redirects),
            session,
            ignored_channels: Vec::new(),
            ignored_nicks: Vec::new(),
        }
    }

    /// Standard stages, resolving hosts through the system resolver.
    pub fn from_config(config: &UrlInfoConfig) -> crate::error::Result<Self> {
        Self::from_config_with_lookup(config, Arc::new(SystemLookup))
    }

    pub fn from_config_with_lookup(
        config: &UrlInfoConfig,
        lookup: Arc<dyn HostLookup>,
    ) -> crate::error::Result<Self> {
        let cookies = match &config.cookie_file {
            Some(path) if path.exists() => CookieStore::load(path)?,
            Some(path) => {
                warn!(path = %path.display(), "cookie file not found, fetching without cookies");
                CookieStore::default()
            }
            None => CookieStore::default(),
        };
        let session =
            SessionSettings::from_config(config, cookies).with_lookup(Arc::clone(&lookup));
        let stages = default_stages(config, lookup)?;
        let pipeline = Self::new(stages, session, config.limits.max_redirects)
            .with_ignores(config.ignored_channels.clone(), config.ignored_nicks.clone());
        info!(
            stages = ?pipeline.chain.stage_names().collect::<Vec<_>>(),
            "url pipeline ready"
        );
        Ok(pipeline)
    }

    /// Channels and senders `on_message` stays quiet for.
    pub fn with_ignores(mut self, channels: Vec<String>, nicks: Vec<String>) -> Self {
        self.ignored_channels = channels;
        self.ignored_nicks = nicks;
        self
    }

    /// Annotate every URL in `text`, in order, over one fresh session.
    pub async fn resolve(&self, text: &str) -> Option<String> {
        let urls = find_urls(text);
        if urls.is_empty() {
            return None;
        }

        let session = match self.session.open() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not open http session");
                return None;
            }
        };

        let mut annotations = Vec::with_capacity(urls.len());
        for candidate in &urls {
            let annotation = match Url::parse(candidate) {
                Ok(url) => match self.chain.run(url, &session).await {
                    Ok(resolution) => resolution.annotation,
                    Err(e) => {
                        let error = format!("{e:#}");
                        warn!(url = %candidate, %error, "url resolution failed");
                        Annotation::new()
                    }
                },
                Err(e) => {
                    debug!(url = %candidate, error = %e, "not a valid url");
                    Annotation::new()
                }
            };
            annotations.push(annotation);
        }
        assemble(&annotations)
    }

    /// Dispatcher entry point: applies the ignore lists and channel filter
    /// before resolving.
    pub async fn on_message(&self, message: &InboundMessage) -> Option<String> {
        if !message.is_channel()
            || !(message.text.contains("http://") || message.text.contains("https://"))
        {
            return None;
        }
        if self
            .ignored_nicks
            .iter()
            .any(|nick| nick.eq_ignore_ascii_case(&message.sender))
            || self
                .ignored_channels
                .iter()
                .any(|channel| channel.eq_ignore_ascii_case(&message.target))
        {
            debug!(sender = %message.sender, target = %message.target, "ignoring message");
            return None;
        }
        self.resolve(&message.text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::resolvers::ResolveFuture;
    use crate::links::fetcher::Session;
    use crate::links::types::ResolverOutcome;

    /// Answers with the URL's path.
    struct EchoPath;

    impl Resolver for EchoPath {
        fn name(&self) -> &str {
            "echo"
        }

        fn try_resolve<'a>(&'a self, url: &'a Url, _session: &'a Session) -> ResolveFuture<'a> {
            Box::pin(async move {
                match url.path() {
                    "/boom" => anyhow::bail!("stage exploded"),
                    "/quiet" => Ok(ResolverOutcome::Skip),
                    path => Ok(ResolverOutcome::text(path.to_string())),
                }
            })
        }
    }

    fn pipeline() -> UrlInfo {
        UrlInfo::new(vec![Box::new(EchoPath)], SessionSettings::default(), 10)
            .with_ignores(vec!["#quiet".into()], vec!["otherbot".into()])
    }

    #[tokio::test]
    async fn no_urls_no_output() {
        assert_eq!(pipeline().resolve("just chatting").await, None);
    }

    #[tokio::test]
    async fn single_url() {
        assert_eq!(
            pipeline().resolve("look (https://a.example/one)").await,
            Some("/one.".to_string())
        );
    }

    #[tokio::test]
    async fn failing_url_only_costs_its_own_slot() {
        assert_eq!(
            pipeline()
                .resolve("https://a.example/boom https://a.example/two")
                .await,
            Some("(2) /two.".to_string())
        );
    }

    #[tokio::test]
    async fn skipped_urls_say_nothing() {
        assert_eq!(pipeline().resolve("https://a.example/quiet").await, None);
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        assert_eq!(
            pipeline()
                .resolve("https://a.example/x and again https://a.example/x")
                .await,
            Some("(1) /x (2) /x.".to_string())
        );
    }

    #[tokio::test]
    async fn message_filters() {
        let pipeline = pipeline();
        let text = "https://a.example/one";
        assert_eq!(
            pipeline.on_message(&InboundMessage::new("alice", "#rust", text)).await,
            Some("/one.".to_string())
        );
        assert_eq!(
            pipeline.on_message(&InboundMessage::new("OtherBot", "#rust", text)).await,
            None
        );
        assert_eq!(
            pipeline.on_message(&InboundMessage::new("alice", "#quiet", text)).await,
            None
        );
        assert_eq!(
            pipeline.on_message(&InboundMessage::new("alice", "alice", text)).await,
            None
        );
        assert_eq!(
            pipeline
                .on_message(&InboundMessage::new("alice", "#rust", "ftp://a.example/"))
                .await,
            None
        );
    }
}
