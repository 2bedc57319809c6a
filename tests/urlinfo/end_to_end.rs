use onebot::InboundMessage;
use onebot::config::UrlInfoConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use super::web_harness::WebHarness;

#[tokio::test]
async fn single_page_title() {
    let web = WebHarness::start().await;
    web.page("/page", "Hello World").await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["example.com"]);

    let message = format!("check this out {}", web.url("example.com", "/page"));
    assert_eq!(
        pipeline.resolve(&message).await.as_deref(),
        Some("“Hello World”.")
    );
}

#[tokio::test]
async fn several_pages_are_numbered_in_order() {
    let web = WebHarness::start().await;
    web.page("/x", "X").await;
    web.page("/y", "Y").await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["a.test", "b.test"]);

    let message = format!("{} {}", web.url("a.test", "/x"), web.url("b.test", "/y"));
    assert_eq!(
        pipeline.resolve(&message).await.as_deref(),
        Some("(1) “X” (2) “Y”.")
    );
}

#[tokio::test]
async fn urls_inside_sentence_brackets() {
    let web = WebHarness::start().await;
    web.page("/a(b)", "Wiki").await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["wiki.test"]);

    let message = format!("(see {}).", web.url("wiki.test", "/a(b)"));
    assert_eq!(pipeline.resolve(&message).await.as_deref(), Some("“Wiki”."));
}

#[tokio::test]
async fn failing_url_does_not_silence_the_others() {
    let web = WebHarness::start().await;
    web.page("/ok", "Fine").await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["ok.test"]);

    // unknown.test is missing from the fake DNS, so the gate refuses it.
    let message = format!(
        "{} {}",
        web.url("unknown.test", "/"),
        web.url("ok.test", "/ok")
    );
    assert_eq!(
        pipeline.resolve(&message).await.as_deref(),
        Some("(2) “Fine”.")
    );
}

#[tokio::test]
async fn binary_downloads_report_type_and_size() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/file.tar.gz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0u8; 3 * 1024 * 1024], "application/gzip"),
        )
        .mount(&web.server)
        .await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["files.test"]);

    assert_eq!(
        pipeline
            .resolve(&web.url("files.test", "/file.tar.gz"))
            .await
            .as_deref(),
        Some("Content-Type: application/gzip Filesize: 3.0MiB.")
    );
}

#[tokio::test]
async fn http_errors_are_reported() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&web.server)
        .await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["down.test"]);

    assert_eq!(
        pipeline.resolve(&web.url("down.test", "/")).await.as_deref(),
        Some("error: HTTP 503 service unavailable.")
    );
}

#[tokio::test]
async fn dispatcher_filters_apply_before_fetching() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&web.server)
        .await;
    let config = UrlInfoConfig {
        ignored_channels: vec!["#offtopic".into()],
        ignored_nicks: vec!["linkbot".into()],
        ..UrlInfoConfig::default()
    };
    let pipeline = web
        .pipeline(&config, &["example.com"])
        .with_ignores(config.ignored_channels.clone(), config.ignored_nicks.clone());
    let text = web.url("example.com", "/");

    for message in [
        InboundMessage::new("alice", "#offtopic", text.as_str()),
        InboundMessage::new("LinkBot", "#rust", text.as_str()),
        InboundMessage::new("alice", "alice", text.as_str()),
    ] {
        assert_eq!(pipeline.on_message(&message).await, None, "{message:?}");
    }
    web.server.verify().await;
}
