use std::{net::SocketAddr, time::Duration};

use indoc::indoc;
use server::ServeConfig;
use tokio_util::sync::CancellationToken;

fn serve_config(config: &str, shutdown: CancellationToken) -> ServeConfig {
    ServeConfig {
        listen_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        config: toml::from_str(config).unwrap(),
        shutdown,
    }
}

#[tokio::test]
async fn missing_captcha_secret_refuses_to_start() {
    let config = indoc! {r#"
        [chat.upstream]
        api_key = "sk-test"
    "#};

    let result = server::serve(serve_config(config, CancellationToken::new())).await;

    let error = result.unwrap_err().to_string();
    assert!(error.starts_with("No CAPTCHA secret configured"), "{error}");
}

#[tokio::test]
async fn missing_upstream_credential_refuses_to_start() {
    let config = indoc! {r#"
        [captcha]
        secret = "captcha-secret"
    "#};

    let result = server::serve(serve_config(config, CancellationToken::new())).await;

    let error = result.unwrap_err().to_string();
    assert!(error.starts_with("No completion upstream credential configured"), "{error}");
}

#[tokio::test]
async fn stops_on_shutdown() {
    let config = indoc! {r#"
        [captcha]
        secret = "captcha-secret"

        [captcha.alerting]
        enabled = true

        [chat.upstream]
        api_key = "sk-test"
    "#};

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server::serve(serve_config(config, shutdown.clone())));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}
