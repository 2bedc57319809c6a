//! URL annotation pipeline.
//!
//! Chat text goes through the detector, every URL found runs through the
//! resolver chain over a per-message HTTP session, and the assembler folds
//! the annotations into one outbound line.

pub mod assembler;
pub mod chain;
pub mod detector;
pub mod fetcher;
pub mod format;
pub mod pipeline;
pub mod resolvers;
pub mod types;

pub use assembler::assemble;
pub use chain::{ChainState, Resolution, ResolverChain, TOO_MANY_REDIRECTS};
pub use detector::find_urls;
pub use fetcher::{Session, SessionSettings};
pub use pipeline::UrlInfo;
pub use resolvers::{ResolveFuture, Resolver, default_stages};
pub use types::{Annotation, FetchBudget, InboundMessage, ResolverOutcome};
