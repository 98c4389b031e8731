use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{Form, Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// The only token the mock accepts.
pub const VALID_TOKEN: &str = "valid-token";

#[derive(Debug, Deserialize)]
struct SiteVerify {
    secret: String,
    response: String,
}

/// A siteverify endpoint accepting [`VALID_TOKEN`] and rejecting everything else.
#[derive(Clone, Default)]
pub struct CaptchaMock {
    calls: Arc<AtomicUsize>,
}

impl CaptchaMock {
    /// How many verification requests reached the mock.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn spawn(&self) -> SocketAddr {
        let app = Router::new()
            .route("/siteverify", post(site_verify))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        address
    }
}

async fn site_verify(State(mock): State<CaptchaMock>, Form(request): Form<SiteVerify>) -> Json<Value> {
    mock.calls.fetch_add(1, Ordering::SeqCst);

    if request.secret.is_empty() {
        return Json(json!({ "success": false, "error-codes": ["missing-input-secret"] }));
    }

    if request.response == VALID_TOKEN {
        Json(json!({ "success": true, "hostname": "localhost", "error-codes": [] }))
    } else {
        Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
    }
}
