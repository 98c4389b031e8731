use integration_tests::{CompletionMock, TestServer, VALID_TOKEN};
use serde_json::json;

async fn ask(server: &TestServer) -> (u16, serde_json::Value) {
    let response = server
        .client
        .chat(&json!({ "message": "Do you allow pets?", "captchaToken": VALID_TOKEN }))
        .await;

    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn exhausted_quota() {
    let server = TestServer::builder()
        .completion(CompletionMock::quota_exhausted())
        .build("")
        .await;

    let (status, body) = ask(&server).await;

    assert_eq!(status, 402);
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "upstream_quota_exhausted",
      "response": "The assistant is temporarily unavailable. Please contact us directly by phone or email."
    }
    "#);
}

#[tokio::test]
async fn rate_limited() {
    let server = TestServer::builder()
        .completion(CompletionMock::rate_limited())
        .build("")
        .await;

    let (status, body) = ask(&server).await;

    assert_eq!(status, 429);
    assert_eq!(body["error"], "upstream_rate_limited");
    assert!(body.get("retryAfter").is_none());
}

#[tokio::test]
async fn unavailable() {
    let server = TestServer::builder()
        .completion(CompletionMock::unavailable())
        .build("")
        .await;

    let (status, body) = ask(&server).await;

    assert_eq!(status, 500);
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "upstream_unavailable",
      "response": "The assistant could not be reached. Please try again later."
    }
    "#);
}
