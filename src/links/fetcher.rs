//! Per-message HTTP session and the bounded body reader.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use url::Url;

use super::types::FetchBudget;
use crate::config::{CookieStore, UrlInfoConfig};
use crate::error::FetchError;
use crate::security::{HostLookup, PublicAddressResolver, SystemLookup};

/// Everything needed to open a fresh [`Session`] for one message.
#[derive(Clone)]
pub struct SessionSettings {
    pub user_agent: String,
    pub accept_language: String,
    pub cookies: Arc<CookieStore>,
    /// Connect and read timeout of page fetches.
    pub fetch_timeout: Duration,
    /// Total timeout of API calls.
    pub api_timeout: Duration,
    /// Byte ceiling of API response bodies.
    pub api_max_bytes: u64,
    /// Lookup used when the transport connects; private addresses are refused.
    pub lookup: Arc<dyn HostLookup>,
    pinned_hosts: Vec<(String, SocketAddr)>,
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("user_agent", &self.user_agent)
            .field("accept_language", &self.accept_language)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("api_timeout", &self.api_timeout)
            .field("api_max_bytes", &self.api_max_bytes)
            .field("pinned_hosts", &self.pinned_hosts)
            .finish_non_exhaustive()
    }
}

impl SessionSettings {
    pub fn from_config(config: &UrlInfoConfig, cookies: CookieStore) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            cookies: Arc::new(cookies),
            fetch_timeout: config.limits.fetch_timeout(),
            api_timeout: config.limits.api_timeout(),
            api_max_bytes: config.limits.stream_max_bytes,
            lookup: Arc::new(SystemLookup),
            pinned_hosts: Vec::new(),
        }
    }

    /// Resolve hostnames at connect time through `lookup`.
    pub fn with_lookup(mut self, lookup: Arc<dyn HostLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Send requests for `host` to `addr` instead of resolving it.
    ///
    /// The port of `addr` is ignored by the transport; it comes from the URL.
    /// Pinned hosts bypass the connect-time address check.
    pub fn pin_host(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.pinned_hosts.push((host.into(), addr));
        self
    }

    /// Build a new client: no redirects, no state shared with earlier
    /// sessions, cookies seeded from the store.
    pub fn open(&self) -> Result<Session, FetchError> {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&self.accept_language)
            .map_err(|e| FetchError::InvalidHeader(format!("Accept-Language: {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(self.fetch_timeout)
            .read_timeout(self.fetch_timeout)
            .cookie_provider(Arc::new(self.cookies.jar()))
            .dns_resolver(PublicAddressResolver::new(Arc::clone(&self.lookup)));
        for (host, addr) in &self.pinned_hosts {
            builder = builder.resolve(host, *addr);
        }

        Ok(Session {
            client: builder.build()?,
            api_timeout: self.api_timeout,
            api_max_bytes: self.api_max_bytes,
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&UrlInfoConfig::default(), CookieStore::default())
    }
}

/// HTTP state for the processing of exactly one inbound message.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    api_timeout: Duration,
    api_max_bytes: u64,
}

impl Session {
    /// Page fetch, bounded by the transport's connect/read timeouts.
    pub fn get(&self, url: &Url) -> RequestBuilder {
        self.client.get(url.as_str())
    }

    /// API call, bounded by the total API timeout.
    pub fn api_get(&self, url: &Url) -> RequestBuilder {
        self.client.get(url.as_str()).timeout(self.api_timeout)
    }

    /// Body budget of an API response.
    pub fn api_budget(&self) -> FetchBudget {
        FetchBudget {
            max_bytes: self.api_max_bytes,
            max_duration: self.api_timeout,
            keep_bytes: usize::try_from(self.api_max_bytes).unwrap_or(usize::MAX),
        }
    }
}

/// Result of reading a body of undeclared length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRead {
    Complete { size: u64, body: Vec<u8> },
    Aborted(AbortReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    TooLarge,
    TooSlow,
}

/// Byte counter and deadline for one streamed body.
#[derive(Debug)]
pub struct BoundedBody {
    budget: FetchBudget,
    started: Instant,
    bytes_read: u64,
    kept: Vec<u8>,
}

impl BoundedBody {
    pub fn new(budget: FetchBudget, started: Instant) -> Self {
        Self {
            budget,
            started,
            bytes_read: 0,
            kept: Vec::new(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.started + self.budget.max_duration
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Account for one chunk received at `now`.
    pub fn push(&mut self, chunk: &[u8], now: Instant) -> Result<(), AbortReason> {
        self.bytes_read += chunk.len() as u64;
        if self.bytes_read > self.budget.max_bytes {
            return Err(AbortReason::TooLarge);
        }
        if now.duration_since(self.started) > self.budget.max_duration {
            return Err(AbortReason::TooSlow);
        }
        let room = self.budget.keep_bytes.saturating_sub(self.kept.len());
        self.kept.extend_from_slice(&chunk[..room.min(chunk.len())]);
        Ok(())
    }

    pub fn finish(self) -> BodyRead {
        BodyRead::Complete {
            size: self.bytes_read,
            body: self.kept,
        }
    }
}

/// Stream `response` under `budget`; dropping the response on abort closes
/// the connection.
pub async fn read_bounded(
    mut response: Response,
    budget: FetchBudget,
) -> Result<BodyRead, FetchError> {
    let mut body = BoundedBody::new(budget, Instant::now());
    let deadline = tokio::time::Instant::from_std(body.deadline());
    loop {
        let chunk = match tokio::time::timeout_at(deadline, response.chunk()).await {
            Ok(chunk) => chunk?,
            Err(_) => {
                tracing::debug!(bytes = body.bytes_read(), "body read hit the time ceiling");
                return Ok(BodyRead::Aborted(AbortReason::TooSlow));
            }
        };
        let Some(chunk) = chunk else {
            return Ok(body.finish());
        };
        if let Err(reason) = body.push(&chunk, Instant::now()) {
            tracing::debug!(bytes = body.bytes_read(), ?reason, "body read aborted");
            return Ok(BodyRead::Aborted(reason));
        }
    }
}
