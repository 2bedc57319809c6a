use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::{ResolveFuture, Resolver};
use crate::links::fetcher::Session;
use crate::links::types::ResolverOutcome;
use crate::security::{HostLookup, check_public_url};

/// First stage: refuses URLs whose host resolves to an internal address.
pub struct SafetyGate {
    lookup: Arc<dyn HostLookup>,
}

impl SafetyGate {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }
}

impl Resolver for SafetyGate {
    fn name(&self) -> &str {
        "safety"
    }

    fn try_resolve<'a>(&'a self, url: &'a Url, _session: &'a Session) -> ResolveFuture<'a> {
        Box::pin(async move {
            match check_public_url(self.lookup.as_ref(), url).await {
                Ok(()) => Ok(ResolverOutcome::NoMatch),
                Err(reason) => {
                    debug!(url = %url, %reason, "refusing url");
                    Ok(ResolverOutcome::Skip)
                }
            }
        })
    }
}
