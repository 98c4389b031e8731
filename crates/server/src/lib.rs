//! Warden server library.
//!
//! Provides a reusable server function to serve Warden either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod client_identification;
mod cors;
mod health;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use axum::Router;
use axum_server::{Handle, tls_rustls::RustlsConfig};
use captcha::{CaptchaVerifier, SpamMonitor};
use chat::{AdmissionPipeline, OpenAiCompletion};
use config::Config;
use rate_limit::FixedWindowLimiter;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use client_identification::{ClientIdentificationLayer, resolve_client_identity};

/// Configuration for serving Warden.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Warden TOML configuration.
    pub config: Config,
    /// Cancel to stop the server and its background tasks.
    pub shutdown: CancellationToken,
}

/// Starts and runs the Warden server until `shutdown` is cancelled.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown,
    }: ServeConfig,
) -> anyhow::Result<()> {
    // Configs built in code skip the loader, so check them here too.
    config.validate()?;

    let cors = match &config.server.cors {
        Some(cors_config) => cors::generate(cors_config, &config.server.client_identification.api_key_header),
        None => cors::permissive(),
    };

    let rate_limits = &config.server.rate_limits;

    log::debug!(
        "Rate limiting to {} requests per {:?} and client",
        rate_limits.limit,
        rate_limits.interval
    );

    let limiter = Arc::new(FixedWindowLimiter::new(rate_limits));
    let mut sweeper = limiter.sweeper(rate_limits.sweep_interval);
    sweeper.start();

    let audit = captcha::audit_log(&config.captcha.audit)
        .await
        .context("Failed to open the CAPTCHA audit log")?;

    let verifier = CaptchaVerifier::new(&config.captcha, audit.clone())
        .context("Failed to create the CAPTCHA verification client")?;

    let mut spam_monitor = config
        .captcha
        .alerting
        .enabled
        .then(|| SpamMonitor::new(audit.clone(), config.captcha.alerting.clone()));

    if let Some(monitor) = spam_monitor.as_mut() {
        monitor.start();
    }

    let completion = OpenAiCompletion::new(&config.chat.upstream).context("Failed to create the completion client")?;

    let pipeline = AdmissionPipeline::new(
        &config.chat,
        config.captcha.form_type.clone(),
        limiter,
        Arc::new(verifier),
        Arc::new(completion),
    );

    let mut app = chat::router(Arc::new(pipeline), &config.chat.path)
        .layer(ClientIdentificationLayer::new(
            config.server.client_identification.clone(),
        ))
        .layer(cors.clone());

    if config.server.health.enabled {
        if let Some(listen) = config.server.health.listen {
            tokio::spawn(health::serve_health_endpoint(
                listen,
                config.server.tls.clone(),
                config.server.health.clone(),
                shutdown.clone(),
            ));
        } else {
            app = app.merge(health::router(&config.server.health.path).layer(cors));
        }
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    let result = run(listener, app, &config, shutdown).await;

    sweeper.stop().await;

    if let Some(monitor) = spam_monitor.as_mut() {
        monitor.stop().await;
    }

    log::info!("Warden stopped");

    result
}

async fn run(listener: TcpListener, app: Router, config: &Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listen_address = listener.local_addr()?;
    let path = &config.chat.path;

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            let handle = Handle::new();
            let shutdown_handle = handle.clone();

            tokio::spawn(async move {
                shutdown.cancelled().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            log::info!("Chat endpoint available at: https://{listen_address}{path}");

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            log::info!("Chat endpoint available at: http://{listen_address}{path}");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}
