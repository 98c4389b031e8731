mod captcha;
mod completion;

use std::{net::SocketAddr, sync::Once, time::Duration};

use config::Config;
use reqwest::{Method, RequestBuilder};
use secrecy::SecretString;
use server::ServeConfig;
use tokio::{net::TcpListener, time::timeout};
use tokio_util::sync::CancellationToken;
use url::Url;

pub use captcha::{CaptchaMock, VALID_TOKEN};
pub use completion::CompletionMock;

static INIT: Once = Once::new();

fn init_crypto_provider() {
    INIT.call_once(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .expect("Failed to install default crypto provider");
    });
}

pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn new_with_tls(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Failed to create client with invalid cert acceptance");

        Self { base_url, client }
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Post a JSON body to the chat endpoint from a fixed client address.
    pub async fn chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.request(Method::POST, "/chat")
            .header("x-real-ip", "203.0.113.10")
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(Method::GET, path).send().await.unwrap()
    }
}

#[derive(Default)]
pub struct TestServerBuilder {
    captcha: CaptchaMock,
    completion: CompletionMock,
}

impl TestServerBuilder {
    pub fn captcha(mut self, captcha: CaptchaMock) -> Self {
        self.captcha = captcha;
        self
    }

    pub fn completion(mut self, completion: CompletionMock) -> Self {
        self.completion = completion;
        self
    }

    /// Start Warden with the given TOML, pointing both upstreams at the mocks.
    pub async fn build(self, config_toml: &str) -> TestServer {
        init_crypto_provider();

        let mut config: Config = toml::from_str(config_toml).unwrap();

        let captcha_address = self.captcha.spawn().await;
        let completion_address = self.completion.spawn().await;

        config.captcha.verify_url = Url::parse(&format!("http://{captcha_address}/siteverify")).unwrap();
        config.chat.upstream.base_url = Url::parse(&format!("http://{completion_address}/v1")).unwrap();

        if config.captcha.secret.is_none() {
            config.captcha.secret = Some(SecretString::from("test-captcha-secret".to_string()));
        }

        if config.chat.upstream.api_key.is_none() {
            config.chat.upstream.api_key = Some(SecretString::from("sk-test".to_string()));
        }

        TestServer::start(config, self.captcha, self.completion).await
    }
}

pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    pub captcha: CaptchaMock,
    pub completion: CompletionMock,
    shutdown: CancellationToken,
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    async fn start(config: Config, captcha: CaptchaMock, completion: CompletionMock) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let has_tls = config.server.tls.is_some();
        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown: shutdown.clone(),
        };

        let (tx, mut rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            drop(listener);
            let _ = tx.send(server::serve(serve_config).await);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Ok(Err(e)) = rx.try_recv() {
            eprintln!("Server failed to start: {e:#}");
            std::process::exit(1);
        }

        let protocol = if has_tls { "https" } else { "http" };
        let base_url = format!("{protocol}://{address}");

        let client = if has_tls {
            TestClient::new_with_tls(base_url)
        } else {
            TestClient::new(base_url)
        };

        let mut retries = 10;

        while retries > 0 {
            if timeout(Duration::from_millis(100), client.request(Method::GET, "/").send())
                .await
                .is_ok_and(|response| response.is_ok())
            {
                break;
            }

            retries -= 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestServer {
            client,
            address,
            captcha,
            completion,
            shutdown,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
