use onebot::config::UrlInfoConfig;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

use super::web_harness::WebHarness;

#[tokio::test]
async fn internal_targets_produce_no_output() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&web.server)
        .await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &[]);

    for message in [
        "http://10.0.0.5/secret",
        "http://127.0.0.1/",
        "http://[::1]/",
        "http://localhost:8080/admin",
    ] {
        assert_eq!(pipeline.resolve(message).await, None, "{message}");
    }
    web.server.verify().await;
}

#[tokio::test]
async fn redirect_into_private_network_is_refused() {
    let web = WebHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://169.254.169.254/latest/"),
        )
        .expect(1)
        .mount(&web.server)
        .await;
    let pipeline = web.pipeline(&UrlInfoConfig::default(), &["short.test"]);

    assert_eq!(pipeline.resolve(&web.url("short.test", "/abc")).await, None);
    web.server.verify().await;
}
