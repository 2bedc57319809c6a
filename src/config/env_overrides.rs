use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("ONEBOT_YOUTUBE_API_KEY")
            && !key.is_empty()
        {
            self.urlinfo.youtube.api_key = Some(key);
        }

        if let Ok(token) = std::env::var("ONEBOT_TWITTER_BEARER_TOKEN")
            && !token.is_empty()
        {
            self.urlinfo.twitter.bearer_token = Some(token);
        }

        if let Ok(agent) = std::env::var("ONEBOT_USER_AGENT")
            && !agent.is_empty()
        {
            self.urlinfo.user_agent = agent;
        }

        if let Ok(path) = std::env::var("ONEBOT_COOKIE_FILE")
            && !path.is_empty()
        {
            self.urlinfo.cookie_file = Some(PathBuf::from(path));
        }
    }
}
