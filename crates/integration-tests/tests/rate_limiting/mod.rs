use indoc::indoc;
use integration_tests::{TestServer, VALID_TOKEN};
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn eleventh_request_is_limited() {
    let server = TestServer::builder().build("").await;
    let body = json!({ "message": "Is there Wi-Fi?", "captchaToken": VALID_TOKEN });

    for i in 0..10 {
        let response = server.client.chat(&body).await;

        assert_eq!(response.status(), 200, "request {i}");
        assert_eq!(response.headers()["x-ratelimit-remaining"], (9 - i).to_string().as_str());
    }

    let response = server.client.chat(&body).await;
    assert_eq!(response.status(), 429);

    let retry_after: u64 = response.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["retryAfter"], retry_after);

    // Limited requests never reach the verification or completion services.
    assert_eq!(server.captcha.calls(), 10);
    assert_eq!(server.completion.requests().len(), 10);
}

#[tokio::test]
async fn limited_before_body_is_read() {
    let config = indoc! {r#"
        [server.rate_limits]
        limit = 1
        interval = "1m"
    "#};

    let server = TestServer::builder().build(config).await;

    let response = server.client.chat(&json!({ "message": "Hello" })).await;
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .request(Method::POST, "/chat")
        .header("x-real-ip", "203.0.113.10")
        .body("not json at all")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn clients_are_limited_separately() {
    let config = indoc! {r#"
        [server.rate_limits]
        limit = 1
    "#};

    let server = TestServer::builder().build(config).await;
    let body = json!({ "message": "Hello", "captchaToken": VALID_TOKEN });

    for address in ["198.51.100.1", "198.51.100.2"] {
        let response = server
            .client
            .request(Method::POST, "/chat")
            .header("cf-connecting-ip", address)
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "{address}");
    }

    let response = server
        .client
        .request(Method::POST, "/chat")
        .header("x-forwarded-for", "198.51.100.1, 10.0.0.1")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn window_resets() {
    let config = indoc! {r#"
        [server.rate_limits]
        limit = 1
        interval = "1s"
    "#};

    let server = TestServer::builder().build(config).await;
    let body = json!({ "message": "Hello", "captchaToken": VALID_TOKEN });

    assert_eq!(server.client.chat(&body).await.status(), 200);
    assert_eq!(server.client.chat(&body).await.status(), 429);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert_eq!(server.client.chat(&body).await.status(), 200);
}
