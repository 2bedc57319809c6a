use onebot::config::UrlInfoConfig;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use super::web_harness::WebHarness;

#[tokio::test]
async fn video_title_and_duration() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "snippet": {"title": "Demo"},
                "contentDetails": {"duration": "PT3M45S"}
            }]
        })))
        .mount(&web.server)
        .await;
    let mut config = UrlInfoConfig::default();
    config.youtube.api_key = Some("yt-key".into());
    config.youtube.api_base = web.server.uri();
    let pipeline = web.pipeline(&config, &["www.youtube.com"]);

    assert_eq!(
        pipeline
            .resolve("https://www.youtube.com/watch?v=abc123")
            .await
            .as_deref(),
        Some("“Demo” (3m45s).")
    );
}

#[tokio::test]
async fn aggregator_user_profile() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/user/alice/about.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"name": "alice"}})),
        )
        .mount(&web.server)
        .await;
    let mut config = UrlInfoConfig::default();
    config.reddit.api_base = web.server.uri();
    let pipeline = web.pipeline(&config, &["www.reddit.com"]);

    assert_eq!(
        pipeline
            .resolve("https://www.reddit.com/u/alice")
            .await
            .as_deref(),
        Some("/u/alice on Reddit.")
    );
}

#[tokio::test]
async fn social_posts_without_token_stay_silent() {
    let web = WebHarness::start().await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["x.com"]);
    assert_eq!(
        pipeline.resolve("https://x.com/jane/status/1234").await,
        None
    );
}

#[tokio::test]
async fn mixed_platforms_in_one_message() {
    let web = WebHarness::start().await;
    web.page("/blog", "Blog").await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/jane"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "1", "name": "Jane Doe", "username": "jane"}
        })))
        .mount(&web.server)
        .await;
    let mut config = UrlInfoConfig::default();
    config.twitter.bearer_token = Some("tw-token".into());
    config.twitter.api_base = web.server.uri();
    let pipeline = web.pipeline(&config, &["blog.test", "twitter.com"]);

    let message = format!("{} and https://twitter.com/jane", web.url("blog.test", "/blog"));
    assert_eq!(
        pipeline.resolve(&message).await.as_deref(),
        Some("(1) “Blog” (2) Jane Doe (@jane).")
    );
}
