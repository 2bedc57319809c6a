//! The resolver chain: runs the stages in order against one URL, restarting
//! from the first stage whenever a stage redirects.

use anyhow::Context;
use tracing::debug;
use url::Url;

use super::fetcher::Session;
use super::resolvers::Resolver;
use super::types::{Annotation, ResolverOutcome};

pub const TOO_MANY_REDIRECTS: &str = "Too many redirects";

/// Position of one chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    pub current_url: Url,
    pub stage_index: usize,
    /// Shared by every restart of the run; never reset.
    pub redirect_count: usize,
}

impl ChainState {
    pub fn new(url: Url) -> Self {
        Self {
            current_url: url,
            stage_index: 0,
            redirect_count: 0,
        }
    }
}

/// Final annotation together with the state the run ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub annotation: Annotation,
    pub state: ChainState,
}

pub struct ResolverChain {
    stages: Vec<Box<dyn Resolver>>,
    max_redirects: usize,
}

impl ResolverChain {
    pub fn new(stages: Vec<Box<dyn Resolver>>, max_redirects: usize) -> Self {
        Self {
            stages,
            max_redirects,
        }
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|stage| stage.name())
    }

    pub async fn run(&self, url: Url, session: &Session) -> anyhow::Result<Resolution> {
        let mut state = ChainState::new(url);
        loop {
            let Some(stage) = self.stages.get(state.stage_index) else {
                debug!(url = %state.current_url, "no stage answered");
                return Ok(Resolution {
                    annotation: Annotation::new(),
                    state,
                });
            };

            let outcome = stage
                .try_resolve(&state.current_url, session)
                .await
                .with_context(|| format!("{} failed on {}", stage.name(), state.current_url))?;

            match outcome {
                ResolverOutcome::Answer(annotation) => {
                    debug!(stage = stage.name(), url = %state.current_url, "answered");
                    return Ok(Resolution { annotation, state });
                }
                ResolverOutcome::Skip => {
                    debug!(stage = stage.name(), url = %state.current_url, "skipped");
                    return Ok(Resolution {
                        annotation: Annotation::new(),
                        state,
                    });
                }
                ResolverOutcome::NoMatch => state.stage_index += 1,
                ResolverOutcome::Redirect(next) => {
                    if state.redirect_count >= self.max_redirects {
                        debug!(url = %state.current_url, "redirect ceiling reached");
                        return Ok(Resolution {
                            annotation: vec![TOO_MANY_REDIRECTS.to_string()],
                            state,
                        });
                    }
                    debug!(
                        stage = stage.name(),
                        from = %state.current_url,
                        to = %next,
                        "restarting chain"
                    );
                    state.current_url = next;
                    state.stage_index = 0;
                    state.redirect_count += 1;
                }
            }
        }
    }
}
