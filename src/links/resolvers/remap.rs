use std::collections::{BTreeMap, HashMap};

use url::Url;

use super::{ResolveFuture, Resolver};
use crate::links::fetcher::Session;
use crate::links::types::ResolverOutcome;

/// Rewrites configured hosts and restarts the chain on the result.
///
/// A rewritten URL no longer carries the source host, so the entry cannot
/// fire twice in a row; cycles through several entries are cut by the
/// chain's redirect ceiling.
pub struct HostRemap {
    map: HashMap<String, String>,
}

impl HostRemap {
    pub fn new(map: &BTreeMap<String, String>) -> Self {
        Self {
            map: map
                .iter()
                .map(|(from, to)| (from.to_ascii_lowercase(), to.to_ascii_lowercase()))
                .filter(|(from, to)| from != to)
                .collect(),
        }
    }
}

impl Resolver for HostRemap {
    fn name(&self) -> &str {
        "urlmap"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, _session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(async move {
            let Some(target) = url.host_str().and_then(|host| self.map.get(host)) else {
                return Ok(ResolverOutcome::NoMatch);
            };
            let mut next = url.clone();
            next.set_host(Some(target))?;
            Ok(ResolverOutcome::Redirect(next))
        })
    }
}
