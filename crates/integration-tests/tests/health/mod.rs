use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn enabled_by_default() {
    let server = TestServer::builder().build("").await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);
}

#[tokio::test]
async fn disabled() {
    let config = indoc! {r#"
        [server.health]
        enabled = false
    "#};

    let server = TestServer::builder().build(config).await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn custom_path() {
    let config = indoc! {r#"
        [server.health]
        path = "/status"
    "#};

    let server = TestServer::builder().build(config).await;

    let response = server.client.get("/status").await;
    assert_eq!(response.status(), 200);

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn not_rate_limited() {
    let config = indoc! {r#"
        [server.rate_limits]
        limit = 1
    "#};

    let server = TestServer::builder().build(config).await;

    for _ in 0..3 {
        assert_eq!(server.client.get("/health").await.status(), 200);
    }
}

#[tokio::test]
async fn separate_listener() {
    let health_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let health_address = health_listener.local_addr().unwrap();
    drop(health_listener);

    let config = format!(
        indoc! {r#"
            [server.health]
            listen = "{}"
        "#},
        health_address
    );

    let server = TestServer::builder().build(&config).await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);

    let response = reqwest::get(format!("http://{health_address}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);
}
