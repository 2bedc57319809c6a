//! Persisted cookie set applied to every page fetch.
//!
//! The store is a TOML file of `[[cookie]]` entries, each holding the URL the
//! cookie was issued for and the raw `Set-Cookie` value. `onebot cookies login`
//! fills it by posting login forms.

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Login form fields per site URL, as read from `sites.json`.
pub type LoginSites = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieStore {
    #[serde(default, rename = "cookie")]
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub url: String,
    pub value: String,
}

impl CookieStore {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
        toml::from_str(&contents).context("Failed to parse cookie file")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize cookies")?;
        fs::write(path, toml_str)
            .with_context(|| format!("Failed to write cookie file {}", path.display()))?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Fresh jar seeded with every stored cookie; entries with an unparsable
    /// URL are dropped.
    pub fn jar(&self) -> Jar {
        let jar = Jar::default();
        for cookie in &self.cookies {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.value, &url),
                Err(e) => warn!(url = %cookie.url, error = %e, "skipping cookie with bad url"),
            }
        }
        jar
    }
}

pub fn load_sites(path: &Path) -> Result<LoginSites> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sites file {}", path.display()))?;
    serde_json::from_str(&contents).context("Failed to parse sites file")
}

/// Post each site's login form and collect the cookies it hands out.
///
/// Redirects are not followed so cookies set on a login redirect are kept.
pub async fn login(
    sites: &LoginSites,
    user_agent: &str,
    timeout: Duration,
) -> Result<CookieStore> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("build login client")?;

    let mut store = CookieStore::default();
    for (site, form) in sites {
        let url = Url::parse(site).with_context(|| format!("invalid site url {site}"))?;
        let response = match client.post(url).form(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %site, error = %e, "login request failed");
                continue;
            }
        };
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            warn!(url = %site, %status, "login rejected");
            continue;
        }
        let before = store.cookies.len();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                store.cookies.push(StoredCookie {
                    url: site.clone(),
                    value: value.to_owned(),
                });
            }
        }
        info!(url = %site, cookies = store.cookies.len() - before, "logged in");
    }
    Ok(store)
}
