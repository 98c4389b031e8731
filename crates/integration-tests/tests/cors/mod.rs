use indoc::indoc;
use integration_tests::TestServer;
use reqwest::Method;

#[tokio::test]
async fn default_behavior() {
    let server = TestServer::builder().build("").await;

    let response = server
        .client
        .request(Method::OPTIONS, "/chat")
        .header("Origin", "https://example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert!(headers.contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn explicit_origins() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://stay.example.com", "https://owner.example.org"]
        max_age = "1h"
    "#};

    let server = TestServer::builder().build(config).await;

    let response = server
        .client
        .request(Method::OPTIONS, "/chat")
        .header("Origin", "https://stay.example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type, apikey")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://stay.example.com");
    assert_eq!(headers["access-control-max-age"], "3600");

    let response = server
        .client
        .request(Method::OPTIONS, "/chat")
        .header("Origin", "https://owner.example.org")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "https://owner.example.org");

    let response = server
        .client
        .request(Method::OPTIONS, "/chat")
        .header("Origin", "https://evil.example.net")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn rate_limit_headers_are_exposed() {
    let server = TestServer::builder().build("").await;

    let response = server
        .client
        .request(Method::POST, "/chat")
        .header("Origin", "https://example.com")
        .json(&serde_json::json!({ "message": "Hello" }))
        .send()
        .await
        .unwrap();

    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();

    for header in ["x-ratelimit-limit", "x-ratelimit-remaining", "x-ratelimit-reset", "retry-after"] {
        assert!(exposed.contains(header), "{header} not in {exposed}");
    }
}
