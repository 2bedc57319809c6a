#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onebot::config::{CookieStore, UrlInfoConfig};
use onebot::links::{SessionSettings, default_stages};
use onebot::security::{HostLookup, StaticLookup};
use onebot::UrlInfo;

/// Address the fake DNS hands out for every public test host.
pub const PUBLIC_ADDR: &str = "93.184.216.34";

/// One mock web server standing in for any number of public hostnames.
pub struct WebHarness {
    pub server: MockServer,
}

impl WebHarness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    /// `http://<host>:<mock port><path>`
    pub fn url(&self, host: &str, path: &str) -> String {
        format!("http://{host}:{}{path}", self.port())
    }

    pub async fn page(&self, page: &str, title: &str) {
        let body = format!("<html><head><title>{title}</title></head><body></body></html>");
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html"))
            .mount(&self.server)
            .await;
    }

    /// Pipeline whose Safety Gate sees `hosts` as public and whose sessions
    /// send their requests to the mock server.
    pub fn pipeline(&self, config: &UrlInfoConfig, hosts: &[&str]) -> UrlInfo {
        let public: IpAddr = PUBLIC_ADDR.parse().unwrap();
        let mut lookup = StaticLookup::new();
        let mut session = SessionSettings::from_config(config, CookieStore::default());
        for host in hosts {
            lookup = lookup.with_host(*host, [public]);
            session = session.pin_host(*host, *self.server.address());
        }
        let lookup: Arc<dyn HostLookup> = Arc::new(lookup);
        let stages = default_stages(config, Arc::clone(&lookup)).unwrap();
        UrlInfo::new(stages, session.with_lookup(lookup), config.limits.max_redirects)
    }
}
