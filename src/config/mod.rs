pub mod cookies;
mod env_overrides;
mod loader;
pub mod schema;
#[cfg(test)]
mod test_env;

pub use cookies::{CookieStore, StoredCookie};
pub use schema::{Config, FetchLimits, RedditConfig, TwitterConfig, UrlInfoConfig, YoutubeConfig};
