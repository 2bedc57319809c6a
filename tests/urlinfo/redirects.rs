use onebot::config::UrlInfoConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use super::web_harness::WebHarness;

#[tokio::test]
async fn remapped_host_is_fetched_instead() {
    let web = WebHarness::start().await;
    web.page("/x", "New Site").await;
    let mut config = UrlInfoConfig::default();
    config
        .urlmap
        .insert("old.example.com".into(), "new.example.com".into());
    let pipeline = web.pipeline(&config, &["old.example.com", "new.example.com"]);

    assert_eq!(
        pipeline
            .resolve(&web.url("old.example.com", "/x"))
            .await
            .as_deref(),
        Some("“New Site”.")
    );
    let requests = web.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("host").and_then(|h| h.to_str().ok()),
        Some(format!("new.example.com:{}", web.port()).as_str())
    );
}

#[tokio::test]
async fn http_redirects_rerun_the_chain() {
    let web = WebHarness::start().await;
    let target = web.url("b.test", "/final");
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", target.as_str()))
        .mount(&web.server)
        .await;
    web.page("/final", "Landed").await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["a.test", "b.test"]);

    assert_eq!(
        pipeline.resolve(&web.url("a.test", "/start")).await.as_deref(),
        Some("“Landed”.")
    );
}

#[tokio::test]
async fn redirect_loop_hits_the_ceiling() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&web.server)
        .await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["loop.test"]);

    assert_eq!(
        pipeline.resolve(&web.url("loop.test", "/loop")).await.as_deref(),
        Some("Too many redirects.")
    );
    let requests = web.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);
}

#[tokio::test]
async fn remap_cycle_is_cut_by_the_ceiling() {
    let web = WebHarness::start().await;
    let mut config = UrlInfoConfig::default();
    config.urlmap.insert("a.test".into(), "b.test".into());
    config.urlmap.insert("b.test".into(), "a.test".into());
    let pipeline = web.pipeline(&config, &["a.test", "b.test"]);

    assert_eq!(
        pipeline.resolve(&web.url("a.test", "/")).await.as_deref(),
        Some("Too many redirects.")
    );
}
