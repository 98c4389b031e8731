//! Attaches the resolved client identity to every request.
//!
//! Identification never rejects: every request gets a key, either from a trusted forwarded header
//! or from the fallback hash. Handlers read it as an `Extension<ClientIdentity>`.

use std::{
    sync::Arc,
    task::{Context, Poll},
};

use config::ClientIdentificationConfig;
use http::Request;
use tower::Layer;

use super::resolve_client_identity;

/// Resolves the client identity of each request and stores it in the request extensions.
#[derive(Clone)]
pub struct ClientIdentificationLayer(Arc<ClientIdentificationConfig>);

impl ClientIdentificationLayer {
    /// Create the layer from the identification settings.
    pub fn new(config: ClientIdentificationConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl<Service> Layer<Service> for ClientIdentificationLayer
where
    Service: Send + Clone,
{
    type Service = ClientIdentificationService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        ClientIdentificationService {
            next,
            config: self.0.clone(),
        }
    }
}

/// The service produced by [`ClientIdentificationLayer`].
#[derive(Clone)]
pub struct ClientIdentificationService<Service> {
    next: Service,
    config: Arc<ClientIdentificationConfig>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for ClientIdentificationService<Service>
where
    Service: tower::Service<Request<ReqBody>>,
{
    type Response = Service::Response;
    type Error = Service::Error;
    type Future = Service::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let identity = resolve_client_identity(req.headers(), &self.config);
        log::debug!("Request identified as '{identity}'");

        req.extensions_mut().insert(identity);
        self.next.call(req)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use chat::ClientIdentity;
    use http::Response;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    use super::*;

    #[tokio::test]
    async fn identity_is_inserted() {
        let service = ServiceBuilder::new()
            .layer(ClientIdentificationLayer::new(ClientIdentificationConfig::default()))
            .service(service_fn(|req: Request<()>| async move {
                let identity = req.extensions().get::<ClientIdentity>().cloned();
                Ok::<_, Infallible>(Response::new(identity))
            }));

        let request = Request::builder()
            .header("x-real-ip", "203.0.113.20")
            .body(())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.into_body(), Some(ClientIdentity::new("203.0.113.20")));
    }
}
